//! Purchase transaction processor.
//!
//! Validates and prices a storefront order, encrypts its phone and card fields, and
//! persists the order with all of its items in one transaction.
//!
//! Purchases are recorded as sales only. They do not decrement the stock ledger, so
//! inventory levels move solely through the simulator.

use crate::lifecycle::InFlight;
use crate::metrics::PurchaseMetrics;
use shopfloor_core::environment::Clock;
use shopfloor_core::error::PurchaseError;
use shopfloor_core::money::Money;
use shopfloor_core::purchase::{
    NewPurchase, OrderId, PurchaseItem, PurchaseRequest, PurchaseStatus, PurchaseSummary,
    PurchaseView,
};
use shopfloor_core::repository::PurchaseRepository;
use shopfloor_vault::EncryptionProvider;
use std::sync::Arc;
use std::time::Instant;

/// Key name used when none is configured.
pub const DEFAULT_KEY_NAME: &str = shopfloor_vault::client::DEFAULT_KEY_NAME;

/// Message returned with every committed order.
pub const SUCCESS_MESSAGE: &str = "Purchase completed successfully";

/// Creates and looks up purchases.
#[derive(Clone)]
pub struct PurchaseProcessor {
    repository: Arc<dyn PurchaseRepository>,
    encryption: EncryptionProvider,
    key_name: String,
    clock: Arc<dyn Clock>,
    gate: InFlight,
}

impl PurchaseProcessor {
    /// Processor with the default key name and its own open gate.
    #[must_use]
    pub fn new(
        repository: Arc<dyn PurchaseRepository>,
        encryption: EncryptionProvider,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            encryption,
            key_name: DEFAULT_KEY_NAME.to_string(),
            clock,
            gate: InFlight::new(),
        }
    }

    /// Encrypt sensitive fields under `key_name`.
    #[must_use]
    pub fn with_key_name(mut self, key_name: impl Into<String>) -> Self {
        self.key_name = key_name.into();
        self
    }

    /// Admit calls through `gate` instead of a private one.
    #[must_use]
    pub fn with_gate(mut self, gate: InFlight) -> Self {
        self.gate = gate;
        self
    }

    /// The admission gate; close it to stop taking new purchases.
    #[must_use]
    pub const fn gate(&self) -> &InFlight {
        &self.gate
    }

    /// Validates, prices, encrypts and persists an order.
    ///
    /// # Errors
    ///
    /// - [`PurchaseError::ShuttingDown`]: the gate is closed
    /// - [`PurchaseError::InvalidRequest`]: missing fields, no items, a zero quantity,
    ///   or a total that overflows
    /// - [`PurchaseError::Store`]: the transaction failed and nothing was committed
    pub async fn create_purchase(
        &self,
        request: PurchaseRequest,
    ) -> Result<PurchaseSummary, PurchaseError> {
        let Some(_guard) = self.gate.enter() else {
            PurchaseMetrics::record_failure("shutting_down");
            return Err(PurchaseError::ShuttingDown);
        };

        let (items, total) = price(&request).inspect_err(|e| {
            PurchaseMetrics::record_failure("invalid");
            tracing::debug!(error = %e, "Rejected purchase request");
        })?;

        let customer_phone_encrypted = self
            .encryption
            .protect("customer_phone", &self.key_name, &request.customer_phone)
            .await;
        let credit_card_encrypted = self
            .encryption
            .protect("credit_card", &self.key_name, &request.credit_card)
            .await;

        let purchase = NewPurchase {
            order_id: OrderId::generate(),
            customer_name: request.customer_name,
            customer_email: request.customer_email,
            customer_phone_encrypted,
            credit_card_encrypted,
            billing_address: request.billing_address,
            total_amount: total,
            status: PurchaseStatus::Completed,
            created_at: self.clock.now(),
            items,
        };

        let started = Instant::now();
        if let Err(e) = self.repository.insert(&purchase).await {
            PurchaseMetrics::record_failure("store");
            tracing::error!(order_id = %purchase.order_id, error = %e, "Failed to persist purchase");
            return Err(e.into());
        }
        PurchaseMetrics::record_order(started.elapsed());

        tracing::info!(
            order_id = %purchase.order_id,
            items = purchase.items.len(),
            total = %purchase.total_amount,
            "Purchase committed"
        );

        Ok(PurchaseSummary {
            order_id: purchase.order_id,
            status: purchase.status,
            message: SUCCESS_MESSAGE.to_string(),
            total: purchase.total_amount,
            timestamp: purchase.created_at,
        })
    }

    /// Looks up an order. The view never carries phone or card values.
    ///
    /// # Errors
    ///
    /// - [`PurchaseError::InvalidRequest`]: empty order id
    /// - [`PurchaseError::NotFound`]: no such order
    /// - [`PurchaseError::ShuttingDown`]: the gate is closed
    /// - [`PurchaseError::Store`]: the lookup failed
    pub async fn get_purchase(&self, order_id: &OrderId) -> Result<PurchaseView, PurchaseError> {
        if order_id.as_str().trim().is_empty() {
            return Err(PurchaseError::InvalidRequest("Order ID is required".to_string()));
        }

        let Some(_guard) = self.gate.enter() else {
            return Err(PurchaseError::ShuttingDown);
        };

        self.repository
            .find(order_id)
            .await?
            .ok_or_else(|| PurchaseError::NotFound(order_id.clone()))
    }
}

impl std::fmt::Debug for PurchaseProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PurchaseProcessor")
            .field("encryption", &self.encryption)
            .field("key_name", &self.key_name)
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}

/// Validates `request` and returns its priced items and total.
fn price(request: &PurchaseRequest) -> Result<(Vec<PurchaseItem>, Money), PurchaseError> {
    let required = [
        &request.customer_name,
        &request.customer_email,
        &request.customer_phone,
        &request.credit_card,
    ];
    if required.iter().any(|field| field.trim().is_empty()) {
        return Err(invalid("Missing required fields"));
    }
    if request.items.is_empty() {
        return Err(invalid("No items in purchase"));
    }

    let mut items = Vec::with_capacity(request.items.len());
    let mut total = Money::ZERO;
    for line in &request.items {
        if line.quantity == 0 {
            return Err(invalid(format!("Invalid quantity for product {}", line.product_id)));
        }
        let item = PurchaseItem::priced(line).ok_or_else(|| invalid("Purchase total is too large"))?;
        total = total
            .checked_add(item.subtotal)
            .ok_or_else(|| invalid("Purchase total is too large"))?;
        items.push(item);
    }

    Ok((items, total))
}

fn invalid(message: impl Into<String>) -> PurchaseError {
    PurchaseError::InvalidRequest(message.into())
}
