//! Startup seeding of the stock ledger.
//!
//! Seeding resets every row so a fresh run starts from a mix of stock levels, some
//! low enough to trip the restock alerts right away.

use rand::Rng;
use shopfloor_core::error::StoreError;
use shopfloor_core::money::Money;
use sqlx::PgPool;

/// Locations seeded for every product.
pub const SEED_LOCATIONS: [&str; 3] = ["main-store", "downtown-store", "mall-store"];

/// Product ids used when the catalog is empty or unreadable.
pub const FALLBACK_PRODUCT_IDS: [&str; 12] =
    ["1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "12"];

/// Draws an initial quantity: one of four tiers with equal probability, then uniform
/// within the tier (1–5, 6–15, 16–35, 36–65).
pub fn initial_stock<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    match rng.gen_range(0..4) {
        0 => rng.gen_range(1..=5),
        1 => rng.gen_range(6..=15),
        2 => rng.gen_range(16..=35),
        _ => rng.gen_range(36..=65),
    }
}

async fn catalog_ids(pool: &PgPool) -> Vec<String> {
    let rows: Result<Vec<(String,)>, sqlx::Error> =
        sqlx::query_as("SELECT product_id FROM products ORDER BY product_id")
            .fetch_all(pool)
            .await;

    match rows {
        Ok(rows) if !rows.is_empty() => {
            tracing::info!(products = rows.len(), "Seeding from catalog");
            rows.into_iter().map(|(id,)| id).collect()
        }
        Ok(_) => {
            tracing::warn!("Catalog is empty, seeding default product ids");
            FALLBACK_PRODUCT_IDS.iter().map(ToString::to_string).collect()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read catalog, seeding default product ids");
            FALLBACK_PRODUCT_IDS.iter().map(ToString::to_string).collect()
        }
    }
}

/// Clears the ledger and inserts one row per product and seed location.
///
/// Returns the number of rows inserted.
///
/// # Errors
///
/// Returns [`StoreError::Unavailable`] if an insert fails. A failure to clear the
/// existing rows is only logged.
pub async fn seed_inventory<R: Rng + Send + ?Sized>(
    pool: &PgPool,
    rng: &mut R,
) -> Result<usize, StoreError> {
    let product_ids = catalog_ids(pool).await;

    if let Err(e) = sqlx::query("DELETE FROM inventory").execute(pool).await {
        tracing::warn!(error = %e, "Could not clear existing inventory");
    }

    let mut inserted = 0;
    for product_id in &product_ids {
        for location in SEED_LOCATIONS {
            let stock = i32::try_from(initial_stock(rng)).unwrap_or(i32::MAX);
            sqlx::query(
                r"
                INSERT INTO inventory (product_id, location, stock)
                VALUES ($1, $2, $3)
                ON CONFLICT (product_id, location) DO UPDATE SET stock = EXCLUDED.stock, updated_at = NOW()
                ",
            )
            .bind(product_id)
            .bind(location)
            .bind(stock)
            .execute(pool)
            .await
            .map_err(|e| {
                StoreError::Unavailable(format!(
                    "Failed to seed inventory for product {product_id} at {location}: {e}"
                ))
            })?;
            inserted += 1;
        }
    }

    tracing::info!(rows = inserted, "Inventory seeded");
    Ok(inserted)
}

/// Inserts or replaces a catalog product.
///
/// # Errors
///
/// Returns [`StoreError::Unavailable`] if the upsert fails, or
/// [`StoreError::Corrupt`] if the price does not fit the column.
pub async fn insert_product(
    pool: &PgPool,
    product_id: &str,
    name: &str,
    image: &str,
    price: Money,
) -> Result<(), StoreError> {
    let price_cents = price
        .to_db()
        .ok_or_else(|| StoreError::Corrupt(format!("Price out of range: {price}")))?;

    sqlx::query(
        r"
        INSERT INTO products (product_id, name, image, price_cents)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (product_id) DO UPDATE
        SET name = EXCLUDED.name, image = EXCLUDED.image, price_cents = EXCLUDED.price_cents
        ",
    )
    .bind(product_id)
    .bind(name)
    .bind(image)
    .bind(price_cents)
    .execute(pool)
    .await
    .map_err(|e| StoreError::Unavailable(format!("Failed to insert product {product_id}: {e}")))?;

    Ok(())
}

/// Inserts or overwrites a single stock row.
///
/// # Errors
///
/// Returns [`StoreError::Unavailable`] if the upsert fails.
pub async fn set_stock(
    pool: &PgPool,
    product_id: &str,
    location: &str,
    stock: u32,
) -> Result<(), StoreError> {
    let stock = i32::try_from(stock)
        .map_err(|_| StoreError::Corrupt(format!("Stock out of range: {stock}")))?;

    sqlx::query(
        r"
        INSERT INTO inventory (product_id, location, stock)
        VALUES ($1, $2, $3)
        ON CONFLICT (product_id, location) DO UPDATE SET stock = EXCLUDED.stock, updated_at = NOW()
        ",
    )
    .bind(product_id)
    .bind(location)
    .bind(stock)
    .execute(pool)
    .await
    .map_err(|e| StoreError::Unavailable(format!("Failed to set stock: {e}")))?;

    Ok(())
}
