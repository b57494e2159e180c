//! `PostgreSQL` inventory event trail.

use chrono::{DateTime, Utc};
use shopfloor_core::error::StoreError;
use shopfloor_core::event::{EventType, InventoryEvent};
use shopfloor_core::recorder::{EventRecorder, RecorderFuture};
use shopfloor_core::stock::{Location, ProductId};
use sqlx::PgPool;

/// Row shape of `inventory_events` reads.
type EventRow = (String, String, i32, i32, i32, String, DateTime<Utc>);

/// Append-only [`EventRecorder`] over the `inventory_events` table.
#[derive(Clone)]
pub struct PostgresEventRecorder {
    pool: PgPool,
}

impl PostgresEventRecorder {
    /// Create a recorder over the given connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn to_column(value: i64, column: &str) -> Result<i32, StoreError> {
    i32::try_from(value).map_err(|_| StoreError::Corrupt(format!("{column} out of range: {value}")))
}

fn to_event(
    (product_id, event_type, quantity_change, previous_stock, new_stock, location, created_at): EventRow,
) -> Result<InventoryEvent, StoreError> {
    let non_negative = |value: i32, column: &str| {
        u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("Negative {column}: {value}")))
    };

    Ok(InventoryEvent {
        product_id: ProductId::new(product_id),
        event_type: EventType::parse(&event_type)?,
        quantity_change: i64::from(quantity_change),
        previous_stock: non_negative(previous_stock, "previous_stock")?,
        new_stock: non_negative(new_stock, "new_stock")?,
        location: Location::new(location),
        created_at,
    })
}

impl EventRecorder for PostgresEventRecorder {
    fn record(&self, event: InventoryEvent) -> RecorderFuture<'_, ()> {
        Box::pin(async move {
            let quantity_change = to_column(event.quantity_change, "quantity_change")?;
            let previous_stock = to_column(i64::from(event.previous_stock), "previous_stock")?;
            let new_stock = to_column(i64::from(event.new_stock), "new_stock")?;

            sqlx::query(
                r"
                INSERT INTO inventory_events
                    (product_id, event_type, quantity_change, previous_stock, new_stock, location, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ",
            )
            .bind(event.product_id.as_str())
            .bind(event.event_type.as_str())
            .bind(quantity_change)
            .bind(previous_stock)
            .bind(new_stock)
            .bind(event.location.as_str())
            .bind(event.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(format!("Failed to record event: {e}")))?;

            Ok(())
        })
    }

    fn recent(&self, limit: usize) -> RecorderFuture<'_, Vec<InventoryEvent>> {
        Box::pin(async move {
            let limit = i64::try_from(limit).unwrap_or(i64::MAX);
            let rows: Vec<EventRow> = sqlx::query_as(
                r"
                SELECT product_id, event_type, quantity_change, previous_stock, new_stock, location, created_at
                FROM inventory_events
                ORDER BY created_at DESC, id DESC
                LIMIT $1
                ",
            )
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(format!("Failed to query events: {e}")))?;

            rows.into_iter().map(to_event).collect()
        })
    }
}
