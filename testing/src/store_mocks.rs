//! In-memory event recorder and purchase repository.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on a poisoned lock

use shopfloor_core::error::StoreError;
use shopfloor_core::event::InventoryEvent;
use shopfloor_core::purchase::{NewPurchase, OrderId, PurchaseView};
use shopfloor_core::recorder::{EventRecorder, RecorderFuture};
use shopfloor_core::repository::{PurchaseRepository, RepositoryFuture};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// Append-only in-memory [`EventRecorder`].
///
/// `recent` orders by `created_at` descending, then by insertion order descending,
/// like the production table's `(created_at, id)` ordering.
#[derive(Clone, Debug, Default)]
pub struct InMemoryEventRecorder {
    events: Arc<RwLock<Vec<InventoryEvent>>>,
    failing: Arc<AtomicBool>,
}

impl InMemoryEventRecorder {
    /// Create an empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every recorded event, in append order
    #[must_use]
    pub fn events(&self) -> Vec<InventoryEvent> {
        self.events.read().unwrap().clone()
    }

    /// Number of recorded events
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().unwrap().len()
    }

    /// Check if nothing was recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().unwrap().is_empty()
    }

    /// Make `record` fail until called again with `false`
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl EventRecorder for InMemoryEventRecorder {
    fn record(&self, event: InventoryEvent) -> RecorderFuture<'_, ()> {
        Box::pin(async move {
            if self.failing.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("event table unavailable".to_string()));
            }
            self.events.write().unwrap().push(event);
            Ok(())
        })
    }

    fn recent(&self, limit: usize) -> RecorderFuture<'_, Vec<InventoryEvent>> {
        Box::pin(async move {
            let events = self.events.read().unwrap();
            let mut indexed: Vec<_> = events.iter().enumerate().collect();
            indexed.sort_by(|(ia, a), (ib, b)| b.created_at.cmp(&a.created_at).then(ib.cmp(ia)));
            Ok(indexed
                .into_iter()
                .take(limit)
                .map(|(_, event)| event.clone())
                .collect())
        })
    }
}

/// In-memory [`PurchaseRepository`].
///
/// With failure injection on, `insert` fails without storing anything, mirroring a
/// rolled-back transaction.
#[derive(Clone, Debug, Default)]
pub struct InMemoryPurchaseRepository {
    purchases: Arc<RwLock<HashMap<OrderId, NewPurchase>>>,
    failing: Arc<AtomicBool>,
}

impl InMemoryPurchaseRepository {
    /// Create an empty repository
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored purchase with its encrypted fields, for assertions
    #[must_use]
    pub fn stored(&self, order_id: &OrderId) -> Option<NewPurchase> {
        self.purchases.read().unwrap().get(order_id).cloned()
    }

    /// Number of stored purchases
    #[must_use]
    pub fn len(&self) -> usize {
        self.purchases.read().unwrap().len()
    }

    /// Check if nothing was stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.purchases.read().unwrap().is_empty()
    }

    /// Make `insert` fail until called again with `false`
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl PurchaseRepository for InMemoryPurchaseRepository {
    fn insert<'a>(&'a self, purchase: &'a NewPurchase) -> RepositoryFuture<'a, ()> {
        Box::pin(async move {
            if self.failing.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("transaction aborted".to_string()));
            }
            let mut purchases = self.purchases.write().unwrap();
            if purchases.contains_key(&purchase.order_id) {
                return Err(StoreError::Unavailable(format!(
                    "duplicate order id {}",
                    purchase.order_id
                )));
            }
            purchases.insert(purchase.order_id.clone(), purchase.clone());
            Ok(())
        })
    }

    fn find<'a>(&'a self, order_id: &'a OrderId) -> RepositoryFuture<'a, Option<PurchaseView>> {
        Box::pin(async move {
            Ok(self.purchases.read().unwrap().get(order_id).map(|p| PurchaseView {
                order_id: p.order_id.clone(),
                customer_name: p.customer_name.clone(),
                customer_email: p.customer_email.clone(),
                billing_address: p.billing_address.clone(),
                total_amount: p.total_amount,
                status: p.status,
                created_at: p.created_at,
                items: p.items.clone(),
            }))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use shopfloor_core::event::EventType;
    use shopfloor_core::stock::{StockChange, StockKey};

    #[tokio::test]
    async fn recent_is_newest_first_with_insertion_tiebreak() {
        let recorder = InMemoryEventRecorder::new();
        let key = StockKey::new("1", "main-store");
        let t0 = Utc::now();

        for (change, at) in [
            (StockChange::new(5, 4), t0),
            (StockChange::new(4, 3), t0),
            (StockChange::new(3, 2), t0 - Duration::seconds(10)),
        ] {
            recorder
                .record(InventoryEvent::from_change(&key, EventType::Purchase, change, at))
                .await
                .unwrap();
        }

        let recent = recorder.recent(2).await.unwrap();
        assert_eq!(recent[0].new_stock, 3);
        assert_eq!(recent[1].new_stock, 4);
    }

    #[tokio::test]
    async fn failing_recorder_stores_nothing() {
        let recorder = InMemoryEventRecorder::new();
        recorder.set_failing(true);
        let event = InventoryEvent::from_change(
            &StockKey::new("1", "main-store"),
            EventType::Restock,
            StockChange::new(0, 20),
            Utc::now(),
        );
        assert!(recorder.record(event).await.is_err());
        assert!(recorder.is_empty());
    }
}
