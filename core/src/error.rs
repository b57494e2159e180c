//! Error types.
//!
//! | Error | Meaning | Handling |
//! |---|---|---|
//! | [`LedgerError::InsufficientStock`] | lost a race for the last units | skip, non-fatal |
//! | [`PurchaseError::InvalidRequest`] | client input defect | reject before any write |
//! | [`PurchaseError::NotFound`] | lookup miss | reject |
//! | [`StoreError::Unavailable`] | transient infrastructure failure | surface, no retry |
//! | [`EncryptionError`] | secret engine unusable | degrade to the fallback |

use crate::purchase::OrderId;
use crate::stock::StockKey;
use thiserror::Error;

/// Failures of the relational store itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Connection, query or transaction failure.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A stored row could not be decoded into a domain value.
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

/// Errors from stock ledger operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The row holds fewer units than requested. Nothing was changed.
    #[error("Insufficient stock for {key}: requested {requested}, available {available}")]
    InsufficientStock {
        /// Row that was targeted
        key: StockKey,
        /// Units requested
        requested: u32,
        /// Units on hand when the request was evaluated
        available: u32,
    },

    /// No row exists for the key.
    #[error("No stock row for {0}")]
    UnknownStock(StockKey),

    /// Mutations must move at least one unit.
    #[error("Stock mutation amount must be positive")]
    InvalidAmount,

    /// The store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors from the purchase transaction processor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PurchaseError {
    /// The request is malformed. No write was attempted.
    #[error("Invalid purchase request: {0}")]
    InvalidRequest(String),

    /// No purchase with this order id.
    #[error("Purchase not found: {0}")]
    NotFound(OrderId),

    /// The process is shutting down and no longer accepts purchases.
    #[error("Purchase processing is shutting down")]
    ShuttingDown,

    /// The store failed. The order was not committed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors from an encryption provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncryptionError {
    /// The provider is not configured.
    #[error("Encryption provider unavailable")]
    Unavailable,

    /// The provider was reachable but the operation failed.
    #[error("Encryption failed: {0}")]
    Provider(String),
}
