//! Purchases and their line items.
//!
//! A purchase is written once, together with all of its items, and never mutated
//! afterwards. Phone and card values only ever exist here as [`Ciphertext`], so the
//! repository cannot be handed plaintext.

use crate::money::Money;
use crate::stock::ProductId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Human-readable, globally unique order identifier (`INV-` + 32 hex digits).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    /// Prefix of generated identifiers.
    pub const PREFIX: &'static str = "INV-";

    /// Generates a fresh identifier from a random UUID.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("{}{}", Self::PREFIX, Uuid::new_v4().simple()))
    }

    /// Wraps an identifier received from a caller or loaded from storage.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Output of an [`Encryptor`](crate::encryption::Encryptor).
///
/// Either real ciphertext from the secret engine or a versioned fallback digest.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ciphertext(String);

impl Ciphertext {
    /// Wraps an encrypted value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the encoded value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Ciphertext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Ciphertext").field(&"<redacted>").finish()
    }
}

/// Purchase lifecycle status. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    /// Order committed
    Completed,
}

impl PurchaseStatus {
    /// Convert status to database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
        }
    }

    /// Parse status from database string.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Corrupt`](crate::error::StoreError::Corrupt) if the string
    /// doesn't match a known status.
    pub fn parse(s: &str) -> Result<Self, crate::error::StoreError> {
        match s {
            "completed" => Ok(Self::Completed),
            _ => Err(crate::error::StoreError::Corrupt(format!(
                "Invalid purchase status: {s}"
            ))),
        }
    }
}

/// One requested line of a purchase, as sent by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseLine {
    /// Product bought
    pub product_id: ProductId,
    /// Name shown on the receipt
    pub product_name: String,
    /// Units bought
    pub quantity: u32,
    /// Client-supplied unit price
    pub unit_price: Money,
}

/// Incoming purchase request.
///
/// `Debug` redacts the phone and card fields.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    /// Customer name
    pub customer_name: String,
    /// Customer email
    pub customer_email: String,
    /// Customer phone (plaintext, encrypted before persistence)
    pub customer_phone: String,
    /// Payment card or token (plaintext, encrypted before persistence)
    pub credit_card: String,
    /// Billing address
    #[serde(default)]
    pub billing_address: String,
    /// Requested lines
    pub items: Vec<PurchaseLine>,
}

impl fmt::Debug for PurchaseRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PurchaseRequest")
            .field("customer_name", &self.customer_name)
            .field("customer_email", &self.customer_email)
            .field("customer_phone", &"<redacted>")
            .field("credit_card", &"<redacted>")
            .field("billing_address", &self.billing_address)
            .field("items", &self.items)
            .finish()
    }
}

/// Persisted line item. Invariant: `subtotal == quantity * unit_price`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseItem {
    /// Product bought
    pub product_id: ProductId,
    /// Name shown on the receipt
    pub product_name: String,
    /// Units bought
    pub quantity: u32,
    /// Unit price
    pub unit_price: Money,
    /// `quantity * unit_price`
    pub subtotal: Money,
}

impl PurchaseItem {
    /// Prices a requested line. Returns `None` on overflow.
    #[must_use]
    pub fn priced(line: &PurchaseLine) -> Option<Self> {
        Some(Self {
            product_id: line.product_id.clone(),
            product_name: line.product_name.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
            subtotal: line.unit_price.checked_mul(line.quantity)?,
        })
    }
}

/// A fully priced and encrypted order, ready to persist atomically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPurchase {
    /// Order identifier
    pub order_id: OrderId,
    /// Customer name
    pub customer_name: String,
    /// Customer email
    pub customer_email: String,
    /// Encrypted phone
    pub customer_phone_encrypted: Ciphertext,
    /// Encrypted card
    pub credit_card_encrypted: Ciphertext,
    /// Billing address
    pub billing_address: String,
    /// Sum of item subtotals
    pub total_amount: Money,
    /// Status at creation
    pub status: PurchaseStatus,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Owned line items
    pub items: Vec<PurchaseItem>,
}

/// Response to a successful purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseSummary {
    /// Order identifier
    pub order_id: OrderId,
    /// Status at creation
    pub status: PurchaseStatus,
    /// Human-readable outcome
    pub message: String,
    /// Total charged
    pub total: Money,
    /// Creation time
    pub timestamp: DateTime<Utc>,
}

/// Read model of a stored purchase.
///
/// Deliberately has no phone or card fields, encrypted or otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseView {
    /// Order identifier
    pub order_id: OrderId,
    /// Customer name
    pub customer_name: String,
    /// Customer email
    pub customer_email: String,
    /// Billing address
    pub billing_address: String,
    /// Sum of item subtotals
    pub total_amount: Money,
    /// Status
    pub status: PurchaseStatus,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Line items
    pub items: Vec<PurchaseItem>,
}

impl PurchaseView {
    /// Whether the stored total matches its items and every subtotal matches its line.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let lines_ok = self
            .items
            .iter()
            .all(|item| item.unit_price.checked_mul(item.quantity) == Some(item.subtotal));
        let sum = self
            .items
            .iter()
            .try_fold(Money::ZERO, |acc, item| acc.checked_add(item.subtotal));
        lines_ok && sum == Some(self.total_amount)
    }
}
