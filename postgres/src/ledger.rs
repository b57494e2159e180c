//! `PostgreSQL` stock ledger.
//!
//! Mutations run as `BEGIN; SELECT … FOR UPDATE; UPDATE …; COMMIT`. The row lock
//! serializes concurrent mutations of the same key under READ COMMITTED, so a
//! second caller blocks until the first commits and then reads the committed
//! quantity. Rows of different keys never contend.

use chrono::{DateTime, Utc};
use shopfloor_core::error::{LedgerError, StoreError};
use shopfloor_core::ledger::{LedgerFuture, StockLedger};
use shopfloor_core::money::Money;
use shopfloor_core::stock::{InventoryItem, ProductId, StockChange, StockKey, StockRecord};
use sqlx::{PgConnection, PgPool};

/// Direction of a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Remove,
    Add,
}

/// Row shape shared by the candidate queries.
type StockRow = (String, String, i32, DateTime<Utc>);

/// Row shape of the aggregation query.
type AggregateRow = (String, String, String, i64, i64, i64, DateTime<Utc>);

/// `PostgreSQL`-backed [`StockLedger`].
#[derive(Clone)]
pub struct PostgresStockLedger {
    pool: PgPool,
}

impl PostgresStockLedger {
    /// Create a ledger over the given connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Access the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Read-modify-write of one row inside a single transaction.
    async fn mutate(
        &self,
        key: &StockKey,
        amount: u32,
        direction: Direction,
    ) -> Result<StockChange, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        let delta = i32::try_from(amount).map_err(|_| LedgerError::InvalidAmount)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Unavailable(format!("Failed to start transaction: {e}")))?;

        let current = lock_row(&mut *tx, key).await?;

        let new = match direction {
            Direction::Remove if current < delta => {
                let _ = tx.rollback().await; // Ignore rollback errors
                return Err(LedgerError::InsufficientStock {
                    key: key.clone(),
                    requested: amount,
                    available: to_quantity(current)?,
                });
            }
            Direction::Remove => current - delta,
            Direction::Add => current
                .checked_add(delta)
                .ok_or(LedgerError::InvalidAmount)?,
        };

        sqlx::query(
            r"
            UPDATE inventory
            SET stock = $3, updated_at = NOW()
            WHERE product_id = $1 AND location = $2
            ",
        )
        .bind(key.product_id.as_str())
        .bind(key.location.as_str())
        .bind(new)
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::Unavailable(format!("Failed to update inventory: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| StoreError::Unavailable(format!("Failed to commit transaction: {e}")))?;

        Ok(StockChange::new(to_quantity(current)?, to_quantity(new)?))
    }

    async fn fetch_candidate(
        &self,
        query: &'static str,
        threshold: Option<i32>,
    ) -> Result<Option<StockRecord>, LedgerError> {
        let mut q = sqlx::query_as::<_, StockRow>(query);
        if let Some(threshold) = threshold {
            q = q.bind(threshold);
        }
        let row = q
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(format!("Failed to query inventory: {e}")))?;

        row.map(to_record).transpose()
    }
}

/// Locks the row for the rest of the transaction and returns its quantity.
async fn lock_row(conn: &mut PgConnection, key: &StockKey) -> Result<i32, LedgerError> {
    let row: Option<(i32,)> = sqlx::query_as(
        r"
        SELECT stock
        FROM inventory
        WHERE product_id = $1 AND location = $2
        FOR UPDATE
        ",
    )
    .bind(key.product_id.as_str())
    .bind(key.location.as_str())
    .fetch_optional(conn)
    .await
    .map_err(|e| StoreError::Unavailable(format!("Failed to lock inventory row: {e}")))?;

    row.map(|(stock,)| stock)
        .ok_or_else(|| LedgerError::UnknownStock(key.clone()))
}

fn to_quantity(stock: i32) -> Result<u32, LedgerError> {
    u32::try_from(stock)
        .map_err(|_| StoreError::Corrupt(format!("Negative stock: {stock}")).into())
}

fn to_record((product_id, location, stock, updated_at): StockRow) -> Result<StockRecord, LedgerError> {
    Ok(StockRecord {
        key: StockKey::new(product_id, location),
        quantity: to_quantity(stock)?,
        last_updated: updated_at,
    })
}

#[allow(clippy::cast_sign_loss)] // Sums of CHECK (stock >= 0) columns
fn to_item(
    (product_id, name, image, price_cents, online, in_store, last_updated): AggregateRow,
) -> Result<InventoryItem, LedgerError> {
    let price = Money::from_db(price_cents)
        .ok_or_else(|| StoreError::Corrupt(format!("Negative price: {price_cents}")))?;

    Ok(InventoryItem::new(
        ProductId::new(product_id),
        name,
        image,
        price,
        online.max(0) as u64,
        in_store.max(0) as u64,
        last_updated,
    ))
}

impl StockLedger for PostgresStockLedger {
    fn decrement<'a>(&'a self, key: &'a StockKey, amount: u32) -> LedgerFuture<'a, StockChange> {
        Box::pin(self.mutate(key, amount, Direction::Remove))
    }

    fn increment<'a>(&'a self, key: &'a StockKey, amount: u32) -> LedgerFuture<'a, StockChange> {
        Box::pin(self.mutate(key, amount, Direction::Add))
    }

    fn read<'a>(&'a self, key: &'a StockKey) -> LedgerFuture<'a, u32> {
        Box::pin(async move {
            let row: Option<(i32,)> = sqlx::query_as(
                "SELECT stock FROM inventory WHERE product_id = $1 AND location = $2",
            )
            .bind(key.product_id.as_str())
            .bind(key.location.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(format!("Failed to read stock: {e}")))?;

            let (stock,) = row.ok_or_else(|| LedgerError::UnknownStock(key.clone()))?;
            to_quantity(stock)
        })
    }

    fn list_aggregated(&self) -> LedgerFuture<'_, Vec<InventoryItem>> {
        Box::pin(async move {
            let rows: Vec<AggregateRow> = sqlx::query_as(
                r"
                SELECT
                    p.product_id,
                    p.name,
                    p.image,
                    p.price_cents,
                    COALESCE(SUM(CASE WHEN i.location LIKE '%online%' OR i.location = 'main-store'
                                      THEN i.stock ELSE 0 END), 0)::BIGINT AS online_stock,
                    COALESCE(SUM(CASE WHEN i.location <> 'main-store' AND i.location NOT LIKE '%online%'
                                      THEN i.stock ELSE 0 END), 0)::BIGINT AS in_store_stock,
                    COALESCE(MAX(i.updated_at), NOW()) AS last_updated
                FROM products p
                LEFT JOIN inventory i ON p.product_id = i.product_id
                GROUP BY p.product_id, p.name, p.image, p.price_cents
                ORDER BY p.product_id
                ",
            )
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(format!("Failed to query inventory: {e}")))?;

            rows.into_iter().map(to_item).collect()
        })
    }

    fn sample_in_stock(&self) -> LedgerFuture<'_, Option<StockRecord>> {
        Box::pin(self.fetch_candidate(
            r"
            SELECT product_id, location, stock, updated_at
            FROM inventory
            WHERE stock > 0
            ORDER BY RANDOM()
            LIMIT 1
            ",
            None,
        ))
    }

    fn lowest_stock(&self, threshold: u32) -> LedgerFuture<'_, Option<StockRecord>> {
        Box::pin(async move {
            let threshold = i32::try_from(threshold).unwrap_or(i32::MAX);
            self.fetch_candidate(
                r"
                SELECT product_id, location, stock, updated_at
                FROM inventory
                WHERE stock <= $1
                ORDER BY stock ASC, RANDOM()
                LIMIT 1
                ",
                Some(threshold),
            )
            .await
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn negative_stock_is_corrupt() {
        assert!(matches!(
            to_quantity(-1),
            Err(LedgerError::Store(StoreError::Corrupt(_)))
        ));
        assert_eq!(to_quantity(12).unwrap(), 12);
    }

    #[test]
    fn aggregate_row_derives_flags() {
        let item = to_item((
            "7".to_string(),
            "Mug".to_string(),
            "/mug.png".to_string(),
            1_250,
            0,
            9,
            Utc::now(),
        ))
        .unwrap();
        assert!(!item.online_in_stock);
        assert!(item.in_store_in_stock);
        assert_eq!(item.price, Money::from_cents(1_250));
    }

    #[test]
    fn aggregate_row_rejects_negative_price() {
        let row = ("1".to_string(), "x".to_string(), String::new(), -5, 0, 0, Utc::now());
        assert!(to_item(row).is_err());
    }
}
