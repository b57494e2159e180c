//! # Shopfloor Core
//!
//! Domain types and collaborator traits for the Shopfloor inventory engine.
//!
//! The engine keeps a ledger of stock quantities per `(product, location)` that is
//! mutated concurrently by a background simulator and read by the storefront, records
//! an append-only trail of every stock mutation, and persists customer purchases with
//! their sensitive fields encrypted.
//!
//! This crate performs no I/O. It defines:
//!
//! - **Types**: [`stock`], [`event`], [`money`], [`purchase`]
//! - **Errors**: [`error`], one enum per concern
//! - **Collaborators**: [`ledger::StockLedger`], [`recorder::EventRecorder`],
//!   [`repository::PurchaseRepository`], [`encryption::Encryptor`] and
//!   [`environment::Clock`]
//!
//! Implementations live in `shopfloor-postgres` (production), `shopfloor-vault`
//! (encryption) and `shopfloor-testing` (in-memory doubles).
//!
//! ## Example
//!
//! ```
//! use shopfloor_core::stock::{StockChange, StockKey};
//! use shopfloor_core::event::{EventType, InventoryEvent};
//! use chrono::Utc;
//!
//! let key = StockKey::new("7", "main-store");
//! let change = StockChange::new(2, 0);
//! let event = InventoryEvent::from_change(&key, EventType::Purchase, change, Utc::now());
//!
//! assert_eq!(event.quantity_change, -2);
//! assert!(event.is_consistent());
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};

/// Encryption capability used for sensitive purchase fields
pub mod encryption;

/// Error taxonomy
pub mod error;

/// Inventory events (the append-only audit trail)
pub mod event;

/// Stock ledger trait
pub mod ledger;

/// Integer-cent money type
pub mod money;

/// Purchases, line items and their read models
pub mod purchase;

/// Event recorder trait
pub mod recorder;

/// Purchase repository trait
pub mod repository;

/// Stock keys, records and levels
pub mod stock;

/// Environment module - Injected dependencies
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use shopfloor_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let before = clock.now();
    /// assert!(clock.now() >= before);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

pub use error::{EncryptionError, LedgerError, PurchaseError, StoreError};
pub use event::{EventType, InventoryEvent};
pub use money::Money;
pub use stock::{Location, ProductId, StockChange, StockKey, StockLevel, StockRecord};
