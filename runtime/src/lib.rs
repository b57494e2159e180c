//! # Shopfloor Runtime
//!
//! Services that drive the Shopfloor inventory engine.
//!
//! ## Core Components
//!
//! - **Inventory**: ledger mutations with best-effort event recording
//! - **Simulator**: purchase and restock generators on fixed intervals
//! - **Purchase processor**: validated, encrypted, atomic order persistence
//! - **In-flight gate**: refuses new work during shutdown and drains the rest
//! - **Metrics**: Prometheus counters and histograms
//!
//! Every service works against the traits in `shopfloor-core`, so the same code runs
//! over Postgres in production and over the in-memory doubles of
//! `shopfloor-testing` in tests.
//!
//! ## Example
//!
//! ```rust,ignore
//! use shopfloor_runtime::{Inventory, PurchaseProcessor};
//!
//! let inventory = Inventory::new(ledger, recorder, clock.clone());
//! let event = inventory.purchase(&key, 2).await?;
//!
//! let processor = PurchaseProcessor::new(repository, encryption, clock);
//! let summary = processor.create_purchase(request).await?;
//! ```

/// Ledger plus event trail
pub mod inventory;

/// Graceful shutdown gate
pub mod lifecycle;

/// Prometheus metrics for observability
pub mod metrics;

/// Purchase transaction processor
pub mod purchase;

/// Simulation scheduler
pub mod simulator;

pub use inventory::{Inventory, RECENT_EVENTS_LIMIT};
pub use lifecycle::{InFlight, InFlightGuard};
pub use metrics::{InventoryMetrics, MetricsError, MetricsRecorder, PurchaseMetrics};
pub use purchase::PurchaseProcessor;
pub use simulator::{
    Generator, PurchaseGenerator, RestockGenerator, Simulator, SimulatorConfig, TickOutcome,
};
