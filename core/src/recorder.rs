//! Event recorder trait.
//!
//! Appends [`InventoryEvent`]s after ledger mutations and serves the recent-events
//! feed. Appends are independent of the mutation they describe: a failed append
//! never undoes the stock change.

use crate::error::StoreError;
use crate::event::InventoryEvent;
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by recorder operations.
pub type RecorderFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Append-only inventory event trail.
pub trait EventRecorder: Send + Sync {
    /// Appends one event.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the append failed. Callers treat this as a gap in the
    /// trail, not as a failure of the mutation.
    fn record(&self, event: InventoryEvent) -> RecorderFuture<'_, ()>;

    /// The most recent `limit` events, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the query failed or a row could not be decoded.
    fn recent(&self, limit: usize) -> RecorderFuture<'_, Vec<InventoryEvent>>;
}
