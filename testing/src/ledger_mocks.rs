//! In-memory stock ledger.
//!
//! A single mutex guards every row, so each mutation is one critical section and the
//! ledger is trivially linearizable. Good enough for tests that hammer one key from
//! many tasks.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on a poisoned lock

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use shopfloor_core::error::{LedgerError, StoreError};
use shopfloor_core::ledger::{LedgerFuture, StockLedger};
use shopfloor_core::money::Money;
use shopfloor_core::stock::{InventoryItem, ProductId, StockChange, StockKey, StockRecord};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
struct Product {
    name: String,
    image: String,
    price: Money,
}

#[derive(Debug, Default)]
struct State {
    rows: HashMap<StockKey, StockRecord>,
    products: BTreeMap<ProductId, Product>,
    unavailable: Option<String>,
}

/// `HashMap`-backed [`StockLedger`] for fast, deterministic tests.
///
/// # Example
///
/// ```
/// use shopfloor_testing::InMemoryStockLedger;
/// use shopfloor_core::ledger::StockLedger;
/// use shopfloor_core::stock::StockKey;
///
/// # tokio_test::block_on(async {
/// let ledger = InMemoryStockLedger::new();
/// let key = StockKey::new("7", "main-store");
/// ledger.set_stock(&key, 2);
///
/// let change = ledger.decrement(&key, 2).await.unwrap();
/// assert_eq!(change.new, 0);
/// # });
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryStockLedger {
    state: Arc<Mutex<State>>,
}

impl InMemoryStockLedger {
    /// Create an empty ledger
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a row
    pub fn set_stock(&self, key: &StockKey, quantity: u32) {
        let record = StockRecord {
            key: key.clone(),
            quantity,
            last_updated: Utc::now(),
        };
        self.state.lock().unwrap().rows.insert(key.clone(), record);
    }

    /// Insert or overwrite a catalog product
    pub fn add_product(&self, id: &str, name: &str, price: Money) {
        self.state.lock().unwrap().products.insert(
            ProductId::new(id),
            Product {
                name: name.to_string(),
                image: format!("/images/{id}.png"),
                price,
            },
        );
    }

    /// Current quantity of a row, if present
    #[must_use]
    pub fn stock(&self, key: &StockKey) -> Option<u32> {
        self.state.lock().unwrap().rows.get(key).map(|r| r.quantity)
    }

    /// Make every operation fail with `StoreError::Unavailable(reason)` until
    /// [`restore`](Self::restore) is called
    pub fn fail_with(&self, reason: &str) {
        self.state.lock().unwrap().unavailable = Some(reason.to_string());
    }

    /// Undo [`fail_with`](Self::fail_with)
    pub fn restore(&self) {
        self.state.lock().unwrap().unavailable = None;
    }

    fn check(state: &State) -> Result<(), StoreError> {
        match &state.unavailable {
            Some(reason) => Err(StoreError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }

    fn mutate(
        &self,
        key: &StockKey,
        amount: u32,
        apply: impl FnOnce(u32) -> Result<u32, LedgerError>,
    ) -> Result<StockChange, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        let mut state = self.state.lock().unwrap();
        Self::check(&state)?;

        let record = state
            .rows
            .get_mut(key)
            .ok_or_else(|| LedgerError::UnknownStock(key.clone()))?;
        let previous = record.quantity;
        let new = apply(previous)?;
        record.quantity = new;
        record.last_updated = Utc::now();
        Ok(StockChange::new(previous, new))
    }

    fn pick(&self, filter: impl Fn(&StockRecord) -> bool) -> Result<Vec<StockRecord>, LedgerError> {
        let state = self.state.lock().unwrap();
        Self::check(&state)?;
        Ok(state.rows.values().filter(|r| filter(r)).cloned().collect())
    }
}

impl StockLedger for InMemoryStockLedger {
    fn decrement<'a>(&'a self, key: &'a StockKey, amount: u32) -> LedgerFuture<'a, StockChange> {
        Box::pin(async move {
            self.mutate(key, amount, |available| {
                available
                    .checked_sub(amount)
                    .ok_or_else(|| LedgerError::InsufficientStock {
                        key: key.clone(),
                        requested: amount,
                        available,
                    })
            })
        })
    }

    fn increment<'a>(&'a self, key: &'a StockKey, amount: u32) -> LedgerFuture<'a, StockChange> {
        Box::pin(async move {
            self.mutate(key, amount, |current| {
                current.checked_add(amount).ok_or(LedgerError::InvalidAmount)
            })
        })
    }

    fn read<'a>(&'a self, key: &'a StockKey) -> LedgerFuture<'a, u32> {
        Box::pin(async move {
            let state = self.state.lock().unwrap();
            Self::check(&state)?;
            state
                .rows
                .get(key)
                .map(|r| r.quantity)
                .ok_or_else(|| LedgerError::UnknownStock(key.clone()))
        })
    }

    fn list_aggregated(&self) -> LedgerFuture<'_, Vec<InventoryItem>> {
        Box::pin(async move {
            let state = self.state.lock().unwrap();
            Self::check(&state)?;

            let items = state
                .products
                .iter()
                .map(|(id, product)| {
                    let rows = state.rows.values().filter(|r| &r.key.product_id == id);
                    let (mut online, mut in_store) = (0_u64, 0_u64);
                    let mut last_updated: Option<DateTime<Utc>> = None;
                    for row in rows {
                        if row.key.location.is_online() {
                            online += u64::from(row.quantity);
                        } else {
                            in_store += u64::from(row.quantity);
                        }
                        last_updated = last_updated.max(Some(row.last_updated));
                    }
                    InventoryItem::new(
                        id.clone(),
                        product.name.clone(),
                        product.image.clone(),
                        product.price,
                        online,
                        in_store,
                        last_updated.unwrap_or_else(Utc::now),
                    )
                })
                .collect();
            Ok(items)
        })
    }

    fn sample_in_stock(&self) -> LedgerFuture<'_, Option<StockRecord>> {
        Box::pin(async move {
            let candidates = self.pick(|r| r.quantity > 0)?;
            Ok(candidates.choose(&mut rand::thread_rng()).cloned())
        })
    }

    fn lowest_stock(&self, threshold: u32) -> LedgerFuture<'_, Option<StockRecord>> {
        Box::pin(async move {
            let candidates = self.pick(|r| r.quantity <= threshold)?;
            let Some(lowest) = candidates.iter().map(|r| r.quantity).min() else {
                return Ok(None);
            };
            let tied: Vec<_> = candidates.into_iter().filter(|r| r.quantity == lowest).collect();
            Ok(tied.choose(&mut rand::thread_rng()).cloned())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn decrement_to_zero_then_insufficient() {
        let ledger = InMemoryStockLedger::new();
        let key = StockKey::new("7", "main-store");
        ledger.set_stock(&key, 2);

        assert_eq!(ledger.decrement(&key, 2).await.unwrap(), StockChange::new(2, 0));
        assert!(matches!(
            ledger.decrement(&key, 1).await,
            Err(LedgerError::InsufficientStock { available: 0, .. })
        ));
        assert_eq!(ledger.stock(&key), Some(0));
    }

    #[tokio::test]
    async fn lowest_prefers_smallest_quantity() {
        let ledger = InMemoryStockLedger::new();
        ledger.set_stock(&StockKey::new("1", "main-store"), 8);
        ledger.set_stock(&StockKey::new("2", "main-store"), 0);
        ledger.set_stock(&StockKey::new("3", "main-store"), 50);

        let lowest = ledger.lowest_stock(10).await.unwrap().unwrap();
        assert_eq!(lowest.key, StockKey::new("2", "main-store"));
        assert!(ledger.lowest_stock(0).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn failure_injection() {
        let ledger = InMemoryStockLedger::new();
        let key = StockKey::new("1", "main-store");
        ledger.set_stock(&key, 3);
        ledger.fail_with("connection refused");

        assert!(matches!(
            ledger.decrement(&key, 1).await,
            Err(LedgerError::Store(StoreError::Unavailable(_)))
        ));
        ledger.restore();
        assert_eq!(ledger.read(&key).await.unwrap(), 3);
    }
}
