//! Purchase repository trait.

use crate::error::StoreError;
use crate::purchase::{NewPurchase, OrderId, PurchaseView};
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by repository operations.
pub type RepositoryFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Persistence for purchases and their line items.
pub trait PurchaseRepository: Send + Sync {
    /// Persists the order row and every item row as one all-or-nothing transaction.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if any insert or the commit failed. In that case no row of
    /// the order is visible.
    fn insert<'a>(&'a self, purchase: &'a NewPurchase) -> RepositoryFuture<'a, ()>;

    /// Loads an order with its items, or `None` if no order has this id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the query failed or a row could not be decoded.
    fn find<'a>(&'a self, order_id: &'a OrderId) -> RepositoryFuture<'a, Option<PurchaseView>>;
}
