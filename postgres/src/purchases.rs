//! `PostgreSQL` purchase repository.
//!
//! An order and its items are written in one transaction. Any failed statement rolls
//! the whole order back, so readers see either the complete order or nothing.

use chrono::{DateTime, Utc};
use shopfloor_core::error::StoreError;
use shopfloor_core::money::Money;
use shopfloor_core::purchase::{
    NewPurchase, OrderId, PurchaseItem, PurchaseStatus, PurchaseView,
};
use shopfloor_core::repository::{PurchaseRepository, RepositoryFuture};
use shopfloor_core::stock::ProductId;
use sqlx::{PgConnection, PgPool};

/// Row shape of the `purchases` read.
type PurchaseRow = (i64, String, String, String, String, i64, String, DateTime<Utc>);

/// Row shape of the `purchase_items` read.
type ItemRow = (String, String, i32, i64, i64);

/// [`PurchaseRepository`] over the `purchases` and `purchase_items` tables.
#[derive(Clone)]
pub struct PostgresPurchaseRepository {
    pool: PgPool,
}

impl PostgresPurchaseRepository {
    /// Create a repository over the given connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_purchase(&self, purchase: &NewPurchase) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Unavailable(format!("Failed to start transaction: {e}")))?;

        if let Err(e) = write_rows(&mut *tx, purchase).await {
            let _ = tx.rollback().await; // Ignore rollback errors
            return Err(e);
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::Unavailable(format!("Failed to commit purchase: {e}")))?;

        tracing::debug!(
            order_id = %purchase.order_id,
            items = purchase.items.len(),
            "Purchase persisted"
        );

        Ok(())
    }

    async fn find_purchase(&self, order_id: &OrderId) -> Result<Option<PurchaseView>, StoreError> {
        let row: Option<PurchaseRow> = sqlx::query_as(
            r"
            SELECT id, order_id, customer_name, customer_email, billing_address,
                   total_amount_cents, status, created_at
            FROM purchases
            WHERE order_id = $1
            ",
        )
        .bind(order_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Unavailable(format!("Failed to query purchase: {e}")))?;

        let Some((id, order_id, customer_name, customer_email, billing_address, total, status, created_at)) =
            row
        else {
            return Ok(None);
        };

        let items: Vec<ItemRow> = sqlx::query_as(
            r"
            SELECT product_id, product_name, quantity, unit_price_cents, subtotal_cents
            FROM purchase_items
            WHERE purchase_id = $1
            ORDER BY id
            ",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Unavailable(format!("Failed to query purchase items: {e}")))?;

        Ok(Some(PurchaseView {
            order_id: OrderId::new(order_id),
            customer_name,
            customer_email,
            billing_address,
            total_amount: money_from_db(total)?,
            status: PurchaseStatus::parse(&status)?,
            created_at,
            items: items.into_iter().map(to_item).collect::<Result<_, _>>()?,
        }))
    }
}

/// Inserts the order row, then each item row, on the caller's transaction.
async fn write_rows(conn: &mut PgConnection, purchase: &NewPurchase) -> Result<(), StoreError> {
    let (purchase_id,): (i64,) = sqlx::query_as(
        r"
        INSERT INTO purchases
            (order_id, customer_name, customer_email, customer_phone_encrypted,
             credit_card_encrypted, billing_address, total_amount_cents, status, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING id
        ",
    )
    .bind(purchase.order_id.as_str())
    .bind(&purchase.customer_name)
    .bind(&purchase.customer_email)
    .bind(purchase.customer_phone_encrypted.as_str())
    .bind(purchase.credit_card_encrypted.as_str())
    .bind(&purchase.billing_address)
    .bind(money_to_db(purchase.total_amount)?)
    .bind(purchase.status.as_str())
    .bind(purchase.created_at)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| StoreError::Unavailable(format!("Failed to insert purchase: {e}")))?;

    for item in &purchase.items {
        let quantity = i32::try_from(item.quantity)
            .map_err(|_| StoreError::Corrupt(format!("Quantity out of range: {}", item.quantity)))?;

        sqlx::query(
            r"
            INSERT INTO purchase_items
                (purchase_id, product_id, product_name, quantity, unit_price_cents, subtotal_cents)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(purchase_id)
        .bind(item.product_id.as_str())
        .bind(&item.product_name)
        .bind(quantity)
        .bind(money_to_db(item.unit_price)?)
        .bind(money_to_db(item.subtotal)?)
        .execute(&mut *conn)
        .await
        .map_err(|e| StoreError::Unavailable(format!("Failed to insert purchase item: {e}")))?;
    }

    Ok(())
}

fn money_to_db(amount: Money) -> Result<i64, StoreError> {
    amount
        .to_db()
        .ok_or_else(|| StoreError::Corrupt(format!("Amount out of range: {amount}")))
}

fn money_from_db(cents: i64) -> Result<Money, StoreError> {
    Money::from_db(cents).ok_or_else(|| StoreError::Corrupt(format!("Negative amount: {cents}")))
}

fn to_item(
    (product_id, product_name, quantity, unit_price, subtotal): ItemRow,
) -> Result<PurchaseItem, StoreError> {
    Ok(PurchaseItem {
        product_id: ProductId::new(product_id),
        product_name,
        quantity: u32::try_from(quantity)
            .map_err(|_| StoreError::Corrupt(format!("Negative quantity: {quantity}")))?,
        unit_price: money_from_db(unit_price)?,
        subtotal: money_from_db(subtotal)?,
    })
}

impl PurchaseRepository for PostgresPurchaseRepository {
    fn insert<'a>(&'a self, purchase: &'a NewPurchase) -> RepositoryFuture<'a, ()> {
        Box::pin(self.insert_purchase(purchase))
    }

    fn find<'a>(&'a self, order_id: &'a OrderId) -> RepositoryFuture<'a, Option<PurchaseView>> {
        Box::pin(self.find_purchase(order_id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn item_row_maps() {
        let item = to_item(("7".to_string(), "Mug".to_string(), 2, 1_000, 2_000)).unwrap();
        assert_eq!(item.quantity, 2);
        assert_eq!(item.subtotal, Money::from_cents(2_000));
    }

    #[test]
    fn negative_columns_are_corrupt() {
        assert!(to_item(("7".to_string(), "Mug".to_string(), -1, 1_000, 0)).is_err());
        assert!(money_from_db(-1).is_err());
        assert!(money_to_db(Money::from_cents(u64::MAX)).is_err());
    }
}
