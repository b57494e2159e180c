//! # Shopfloor Testing
//!
//! Testing utilities for the Shopfloor inventory engine.
//!
//! This crate provides:
//! - A fixed clock for deterministic timestamps
//! - In-memory implementations of every collaborator trait in `shopfloor-core`,
//!   with failure injection
//! - A scriptable encryptor for exercising the encryption fallback
//!
//! ## Example
//!
//! ```
//! use shopfloor_testing::{InMemoryEventRecorder, InMemoryStockLedger, test_clock};
//! use shopfloor_core::environment::Clock;
//! use shopfloor_core::stock::StockKey;
//!
//! let ledger = InMemoryStockLedger::new();
//! ledger.set_stock(&StockKey::new("1", "mall-store"), 4);
//!
//! let recorder = InMemoryEventRecorder::new();
//! assert!(recorder.is_empty());
//! assert_eq!(test_clock().now(), test_clock().now());
//! ```

use chrono::{DateTime, Utc};
use shopfloor_core::environment::Clock;

mod encryption_mocks;
mod ledger_mocks;
mod store_mocks;

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use shopfloor_testing::mocks::FixedClock;
    /// use shopfloor_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Installs a test-friendly tracing subscriber once per process.
///
/// Output goes through the test harness capture; later calls are no-ops.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use encryption_mocks::ScriptedEncryptor;
pub use ledger_mocks::InMemoryStockLedger;
pub use mocks::{FixedClock, test_clock};
pub use store_mocks::{InMemoryEventRecorder, InMemoryPurchaseRepository};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }
}
