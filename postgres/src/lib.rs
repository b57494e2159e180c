//! `PostgreSQL` storage for Shopfloor.
//!
//! This crate implements the collaborator traits of `shopfloor-core` on top of a
//! shared sqlx connection pool:
//!
//! - [`PostgresStockLedger`]: per-row atomic stock mutations using row locks
//! - [`PostgresEventRecorder`]: the append-only `inventory_events` trail
//! - [`PostgresPurchaseRepository`]: all-or-nothing order persistence
//!
//! plus pool construction, embedded migrations and startup seeding.
//!
//! # Example
//!
//! ```no_run
//! use shopfloor_postgres::{DatabaseConfig, PostgresStockLedger, connect, migrate};
//! use shopfloor_core::ledger::StockLedger;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = connect(&DatabaseConfig::default()).await?;
//! migrate(&pool).await?;
//!
//! let ledger = PostgresStockLedger::new(pool.clone());
//! let items = ledger.list_aggregated().await?;
//! println!("{} products", items.len());
//!
//! pool.close().await;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Inventory event trail
pub mod events;

/// Stock ledger
pub mod ledger;

/// Connection pool and migrations
pub mod pool;

/// Purchase repository
pub mod purchases;

/// Startup seeding and catalog helpers
pub mod seed;

pub use events::PostgresEventRecorder;
pub use ledger::PostgresStockLedger;
pub use pool::{DatabaseConfig, connect, migrate, ping};
pub use purchases::PostgresPurchaseRepository;
pub use seed::{insert_product, seed_inventory, set_stock};
