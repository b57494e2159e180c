//! Application facade.
//!
//! [`Shopfloor`] is everything an HTTP layer needs: the two storefront feeds, purchase
//! creation and lookup, and an operator health check.

use crate::resources::ResourceManager;
use shopfloor_core::error::{LedgerError, PurchaseError, StoreError};
use shopfloor_core::event::InventoryEvent;
use shopfloor_core::purchase::{OrderId, PurchaseRequest, PurchaseSummary, PurchaseView};
use shopfloor_core::stock::InventoryItem;
use shopfloor_postgres::{PostgresEventRecorder, PostgresPurchaseRepository, PostgresStockLedger};
use shopfloor_runtime::{InFlight, Inventory, MetricsRecorder, PurchaseProcessor, RECENT_EVENTS_LIMIT};
use sqlx::PgPool;
use std::sync::Arc;

/// Library surface of the running engine.
#[derive(Clone)]
pub struct Shopfloor {
    inventory: Inventory,
    purchases: PurchaseProcessor,
    pool: Option<PgPool>,
    metrics: Option<Arc<MetricsRecorder>>,
}

impl Shopfloor {
    /// Facade over already-built services, without a pool to health-check.
    #[must_use]
    pub const fn new(inventory: Inventory, purchases: PurchaseProcessor) -> Self {
        Self {
            inventory,
            purchases,
            pool: None,
            metrics: None,
        }
    }

    /// Wires the Postgres stores, admitting purchases through `gate`.
    #[must_use]
    pub fn from_resources(resources: &ResourceManager, gate: InFlight) -> Self {
        let pool = resources.pool.clone();
        let inventory = Inventory::new(
            Arc::new(PostgresStockLedger::new(pool.clone())),
            Arc::new(PostgresEventRecorder::new(pool.clone())),
            resources.clock.clone(),
        );
        let purchases = PurchaseProcessor::new(
            Arc::new(PostgresPurchaseRepository::new(pool.clone())),
            resources.encryption.clone(),
            resources.clock.clone(),
        )
        .with_key_name(resources.config.key_name.clone())
        .with_gate(gate);

        Self {
            inventory,
            purchases,
            pool: Some(pool),
            metrics: None,
        }
    }

    /// Attach an installed metrics recorder for [`render_metrics`](Self::render_metrics).
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<MetricsRecorder>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// The inventory service, shared with the simulator.
    #[must_use]
    pub const fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    /// Aggregated stock per product.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Store`] if the ledger could not be read.
    pub async fn list_inventory(&self) -> Result<Vec<InventoryItem>, LedgerError> {
        self.inventory.list().await
    }

    /// The newest 100 inventory events, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the trail could not be read.
    pub async fn recent_events(&self) -> Result<Vec<InventoryEvent>, StoreError> {
        self.inventory.recent_events(RECENT_EVENTS_LIMIT).await
    }

    /// See [`PurchaseProcessor::create_purchase`].
    ///
    /// # Errors
    ///
    /// Returns the processor's [`PurchaseError`].
    pub async fn create_purchase(
        &self,
        request: PurchaseRequest,
    ) -> Result<PurchaseSummary, PurchaseError> {
        self.purchases.create_purchase(request).await
    }

    /// See [`PurchaseProcessor::get_purchase`].
    ///
    /// # Errors
    ///
    /// Returns the processor's [`PurchaseError`].
    pub async fn get_purchase(&self, order_id: &OrderId) -> Result<PurchaseView, PurchaseError> {
        self.purchases.get_purchase(order_id).await
    }

    /// Pings the store, when there is one.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the ping fails.
    pub async fn health(&self) -> Result<(), StoreError> {
        match &self.pool {
            Some(pool) => shopfloor_postgres::ping(pool).await,
            None => Ok(()),
        }
    }

    /// Prometheus exposition text, if metrics are enabled.
    #[must_use]
    pub fn render_metrics(&self) -> Option<String> {
        self.metrics.as_ref().and_then(|m| m.render())
    }
}
