//! Inventory service: ledger mutations followed by best-effort event recording.
//!
//! A mutation that the ledger applied is never undone because its event could not be
//! appended. The failure is logged and counted, and the trail keeps the gap.

use crate::metrics::InventoryMetrics;
use shopfloor_core::environment::Clock;
use shopfloor_core::error::{LedgerError, StoreError};
use shopfloor_core::event::{EventType, InventoryEvent};
use shopfloor_core::ledger::StockLedger;
use shopfloor_core::recorder::EventRecorder;
use shopfloor_core::stock::{InventoryItem, StockChange, StockKey};
use std::sync::Arc;

/// Number of events the storefront feed shows.
pub const RECENT_EVENTS_LIMIT: usize = 100;

/// Ledger plus event trail, shared by the simulator and the storefront.
#[derive(Clone)]
pub struct Inventory {
    ledger: Arc<dyn StockLedger>,
    recorder: Arc<dyn EventRecorder>,
    clock: Arc<dyn Clock>,
}

impl Inventory {
    /// Create the service over its collaborators.
    #[must_use]
    pub fn new(
        ledger: Arc<dyn StockLedger>,
        recorder: Arc<dyn EventRecorder>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            ledger,
            recorder,
            clock,
        }
    }

    /// The underlying ledger.
    #[must_use]
    pub fn ledger(&self) -> &dyn StockLedger {
        self.ledger.as_ref()
    }

    /// Removes `quantity` units and records a purchase event.
    ///
    /// # Errors
    ///
    /// Returns the ledger's error; nothing was changed in that case. Event recording
    /// failures are not returned.
    pub async fn purchase(&self, key: &StockKey, quantity: u32) -> Result<InventoryEvent, LedgerError> {
        let change = self.ledger.decrement(key, quantity).await?;
        Ok(self.record(key, EventType::Purchase, change).await)
    }

    /// Adds `quantity` units and records a restock event.
    ///
    /// # Errors
    ///
    /// Returns the ledger's error; nothing was changed in that case. Event recording
    /// failures are not returned.
    pub async fn restock(&self, key: &StockKey, quantity: u32) -> Result<InventoryEvent, LedgerError> {
        let change = self.ledger.increment(key, quantity).await?;
        Ok(self.record(key, EventType::Restock, change).await)
    }

    /// Aggregated per-product view for the storefront.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Store`] if the ledger could not be read.
    pub async fn list(&self) -> Result<Vec<InventoryItem>, LedgerError> {
        self.ledger.list_aggregated().await
    }

    /// The newest `limit` events, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the trail could not be read.
    pub async fn recent_events(&self, limit: usize) -> Result<Vec<InventoryEvent>, StoreError> {
        self.recorder.recent(limit).await
    }

    async fn record(&self, key: &StockKey, event_type: EventType, change: StockChange) -> InventoryEvent {
        let event = InventoryEvent::from_change(key, event_type, change, self.clock.now());

        if let Err(e) = self.recorder.record(event.clone()).await {
            InventoryMetrics::record_event_dropped();
            tracing::warn!(
                product_id = %key.product_id,
                location = %key.location,
                event_type = %event_type,
                previous_stock = change.previous,
                new_stock = change.new,
                error = %e,
                "Failed to record inventory event, stock change kept"
            );
        }

        event
    }
}
