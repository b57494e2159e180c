//! Stock ledger trait.
//!
//! The ledger is the authoritative store of current stock per `(product, location)`.
//! Every mutation is a single atomic read-modify-write scoped to one row, so
//! concurrent mutations of the same key are applied in a strict serial order and
//! none is lost.
//!
//! # Implementations
//!
//! - `PostgresStockLedger` (in `shopfloor-postgres`): row lock inside a transaction
//! - `InMemoryStockLedger` (in `shopfloor-testing`): per-key mutex
//!
//! # Example
//!
//! ```no_run
//! use shopfloor_core::ledger::StockLedger;
//! use shopfloor_core::stock::StockKey;
//! use shopfloor_core::error::LedgerError;
//!
//! async fn sell_one<L: StockLedger>(ledger: &L) -> Result<(), LedgerError> {
//!     let key = StockKey::new("7", "main-store");
//!     let change = ledger.decrement(&key, 1).await?;
//!     assert_eq!(change.previous - 1, change.new);
//!     Ok(())
//! }
//! ```

use crate::error::LedgerError;
use crate::stock::{InventoryItem, StockChange, StockKey, StockRecord};
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by ledger operations.
pub type LedgerFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, LedgerError>> + Send + 'a>>;

/// Atomic per-row stock operations plus read-side aggregation.
///
/// # Dyn Compatibility
///
/// Methods return boxed futures so the ledger can be shared as `Arc<dyn StockLedger>`
/// between the simulator tasks and the storefront.
pub trait StockLedger: Send + Sync {
    /// Atomically removes `amount` units from a row.
    ///
    /// Linearizable per key: two concurrent callers never both observe the
    /// pre-mutation quantity.
    ///
    /// # Errors
    ///
    /// - `InsufficientStock`: fewer than `amount` units on hand (nothing changed)
    /// - `UnknownStock`: no row for `key`
    /// - `InvalidAmount`: `amount == 0`
    /// - `Store`: the store failed
    fn decrement<'a>(&'a self, key: &'a StockKey, amount: u32) -> LedgerFuture<'a, StockChange>;

    /// Atomically adds `amount` units to a row. No upper bound.
    ///
    /// # Errors
    ///
    /// - `UnknownStock`: no row for `key`
    /// - `InvalidAmount`: `amount == 0`, or the result would not fit the stock column
    /// - `Store`: the store failed
    fn increment<'a>(&'a self, key: &'a StockKey, amount: u32) -> LedgerFuture<'a, StockChange>;

    /// Current quantity of a row.
    ///
    /// # Errors
    ///
    /// - `UnknownStock`: no row for `key`
    /// - `Store`: the store failed
    fn read<'a>(&'a self, key: &'a StockKey) -> LedgerFuture<'a, u32>;

    /// One summary per catalog product, ordered by product id.
    ///
    /// Online stock sums locations for which `Location::is_online` holds; in-store
    /// stock sums the rest.
    ///
    /// # Errors
    ///
    /// - `Store`: the store failed
    fn list_aggregated(&self) -> LedgerFuture<'_, Vec<InventoryItem>>;

    /// A uniformly random row with quantity > 0, or `None` if everything is sold out.
    ///
    /// # Errors
    ///
    /// - `Store`: the store failed
    fn sample_in_stock(&self) -> LedgerFuture<'_, Option<StockRecord>>;

    /// The row with the lowest quantity among rows with quantity ≤ `threshold`, ties
    /// broken randomly. `None` if no row qualifies.
    ///
    /// # Errors
    ///
    /// - `Store`: the store failed
    fn lowest_stock(&self, threshold: u32) -> LedgerFuture<'_, Option<StockRecord>>;
}
