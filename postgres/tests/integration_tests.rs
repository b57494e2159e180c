//! Integration tests for the `PostgreSQL` stores using testcontainers.
//!
//! # Requirements
//!
//! Docker must be running to execute these tests. The tests will automatically start a
//! `PostgreSQL` container using testcontainers.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)] // Test code uses expect for clear failure messages

use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;
use shopfloor_core::error::{LedgerError, StoreError};
use shopfloor_core::event::{EventType, InventoryEvent};
use shopfloor_core::ledger::StockLedger;
use shopfloor_core::money::Money;
use shopfloor_core::purchase::{
    Ciphertext, NewPurchase, OrderId, PurchaseItem, PurchaseLine, PurchaseStatus,
};
use shopfloor_core::recorder::EventRecorder;
use shopfloor_core::repository::PurchaseRepository;
use shopfloor_core::stock::{ProductId, StockChange, StockKey};
use shopfloor_postgres::{
    DatabaseConfig, PostgresEventRecorder, PostgresPurchaseRepository, PostgresStockLedger,
    connect, insert_product, migrate, seed_inventory, set_stock,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;

/// Starts a Postgres container and returns a migrated pool.
///
/// Returns both the container (to keep it alive) and the pool.
///
/// # Panics
/// Panics if container setup fails (test environment issue).
async fn setup_pool() -> (ContainerAsync<Postgres>, PgPool) {
    let container = Postgres::default()
        .start()
        .await
        .expect("Failed to start postgres container");

    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("Failed to get postgres port");

    let config = DatabaseConfig {
        host: "127.0.0.1".to_string(),
        port,
        database: "postgres".to_string(),
        min_connections: 0,
        ..DatabaseConfig::default()
    };

    // Wait for postgres to be ready with retry logic
    let mut retries = 0;
    let max_retries = 60;
    loop {
        if let Ok(pool) = connect(&config).await {
            migrate(&pool).await.expect("Failed to run migrations");
            return (container, pool);
        }

        assert!(retries < max_retries, "Failed to connect after {max_retries} retries");
        retries += 1;
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}

fn purchase(items: Vec<PurchaseItem>) -> NewPurchase {
    let total = items
        .iter()
        .fold(Money::ZERO, |acc, item| acc.checked_add(item.subtotal).unwrap());
    NewPurchase {
        order_id: OrderId::generate(),
        customer_name: "Ada Lovelace".to_string(),
        customer_email: "ada@example.com".to_string(),
        customer_phone_encrypted: Ciphertext::new("vault:v1:phone"),
        credit_card_encrypted: Ciphertext::new("vault:v1:card"),
        billing_address: "12 Analytical Row".to_string(),
        total_amount: total,
        status: PurchaseStatus::Completed,
        created_at: Utc::now(),
        items,
    }
}

fn line(product_id: &str, quantity: u32, cents: u64) -> PurchaseItem {
    PurchaseItem::priced(&PurchaseLine {
        product_id: ProductId::new(product_id),
        product_name: format!("Product {product_id}"),
        quantity,
        unit_price: Money::from_cents(cents),
    })
    .unwrap()
}

#[tokio::test]
async fn test_decrement_and_increment() {
    let (_container, pool) = setup_pool().await;
    set_stock(&pool, "7", "main-store", 2).await.unwrap();
    let ledger = PostgresStockLedger::new(pool);
    let key = StockKey::new("7", "main-store");

    let change = ledger.decrement(&key, 2).await.expect("Failed to decrement");
    assert_eq!(change, StockChange::new(2, 0));

    let change = ledger.increment(&key, 35).await.expect("Failed to increment");
    assert_eq!(change, StockChange::new(0, 35));
    assert_eq!(ledger.read(&key).await.unwrap(), 35);
}

#[tokio::test]
async fn test_insufficient_stock_leaves_row_unchanged() {
    let (_container, pool) = setup_pool().await;
    set_stock(&pool, "3", "mall-store", 1).await.unwrap();
    let ledger = PostgresStockLedger::new(pool);
    let key = StockKey::new("3", "mall-store");

    let result = ledger.decrement(&key, 2).await;
    assert!(
        matches!(
            result,
            Err(LedgerError::InsufficientStock { requested: 2, available: 1, .. })
        ),
        "Should fail with insufficient stock, got: {result:?}"
    );
    assert_eq!(ledger.read(&key).await.unwrap(), 1);
}

#[tokio::test]
async fn test_unknown_key_and_zero_amount() {
    let (_container, pool) = setup_pool().await;
    set_stock(&pool, "1", "main-store", 4).await.unwrap();
    let ledger = PostgresStockLedger::new(pool);

    let missing = StockKey::new("999", "main-store");
    assert!(matches!(
        ledger.decrement(&missing, 1).await,
        Err(LedgerError::UnknownStock(_))
    ));
    assert!(matches!(
        ledger.increment(&StockKey::new("1", "main-store"), 0).await,
        Err(LedgerError::InvalidAmount)
    ));
}

#[tokio::test]
async fn test_concurrent_decrements_never_oversell() {
    let (_container, pool) = setup_pool().await;
    set_stock(&pool, "5", "downtown-store", 8).await.unwrap();
    let ledger = Arc::new(PostgresStockLedger::new(pool));
    let key = StockKey::new("5", "downtown-store");

    let tasks: Vec<_> = (0..20)
        .map(|_| {
            let ledger = Arc::clone(&ledger);
            let key = key.clone();
            tokio::spawn(async move { ledger.decrement(&key, 1).await })
        })
        .collect();

    let mut successes = 0;
    let mut previous_values = Vec::new();
    for task in futures::future::join_all(tasks).await {
        match task.expect("Task panicked") {
            Ok(change) => {
                successes += 1;
                previous_values.push(change.previous);
            }
            Err(LedgerError::InsufficientStock { .. }) => {}
            Err(other) => panic!("Unexpected error: {other:?}"),
        }
    }

    assert_eq!(successes, 8, "Exactly the available units should be sold");
    previous_values.sort_unstable();
    assert_eq!(previous_values, (1..=8).collect::<Vec<_>>(), "Each unit sold once");
    assert_eq!(ledger.read(&key).await.unwrap(), 0);
}

#[tokio::test]
async fn test_aggregation_splits_online_and_in_store() {
    let (_container, pool) = setup_pool().await;
    insert_product(&pool, "7", "Mug", "/mug.png", Money::from_cents(1_250))
        .await
        .unwrap();
    insert_product(&pool, "8", "Cap", "/cap.png", Money::from_cents(900))
        .await
        .unwrap();
    set_stock(&pool, "7", "main-store", 4).await.unwrap();
    set_stock(&pool, "7", "downtown-store", 3).await.unwrap();
    set_stock(&pool, "7", "mall-store", 2).await.unwrap();
    set_stock(&pool, "8", "downtown-store", 0).await.unwrap();

    let items = PostgresStockLedger::new(pool).list_aggregated().await.unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].id, ProductId::new("7"));
    assert_eq!(items[0].online_stock, 4);
    assert_eq!(items[0].in_store_stock, 5);
    assert_eq!(items[0].price, Money::from_cents(1_250));
    assert!(items[0].online_in_stock && items[0].in_store_in_stock);
    assert!(!items[1].online_in_stock);
    assert!(!items[1].in_store_in_stock);
}

#[tokio::test]
async fn test_candidate_queries() {
    let (_container, pool) = setup_pool().await;
    set_stock(&pool, "1", "main-store", 0).await.unwrap();
    set_stock(&pool, "2", "main-store", 3).await.unwrap();
    set_stock(&pool, "3", "main-store", 40).await.unwrap();
    let ledger = PostgresStockLedger::new(pool);

    let lowest = ledger.lowest_stock(10).await.unwrap().expect("Should find a row");
    assert_eq!(lowest.quantity, 0);
    assert_eq!(lowest.key, StockKey::new("1", "main-store"));

    for _ in 0..10 {
        let sampled = ledger.sample_in_stock().await.unwrap().expect("Should find a row");
        assert!(sampled.quantity > 0);
    }
}

#[tokio::test]
async fn test_recorder_returns_newest_first() {
    let (_container, pool) = setup_pool().await;
    let recorder = PostgresEventRecorder::new(pool);
    let key = StockKey::new("4", "mall-store");
    let start = Utc::now();

    for (i, change) in [StockChange::new(10, 8), StockChange::new(8, 30), StockChange::new(30, 29)]
        .into_iter()
        .enumerate()
    {
        let event_type = if change.delta() < 0 { EventType::Purchase } else { EventType::Restock };
        let at = start + chrono::Duration::seconds(i64::try_from(i).unwrap());
        recorder
            .record(InventoryEvent::from_change(&key, event_type, change, at))
            .await
            .expect("Failed to record event");
    }

    let recent = recorder.recent(2).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].new_stock, 29);
    assert_eq!(recent[1].event_type, EventType::Restock);
    assert!(recent.iter().all(InventoryEvent::is_consistent));
}

#[tokio::test]
async fn test_purchase_roundtrip() {
    let (_container, pool) = setup_pool().await;
    let repository = PostgresPurchaseRepository::new(pool);
    let order = purchase(vec![line("1", 2, 1_000), line("2", 1, 550)]);

    repository.insert(&order).await.expect("Failed to insert purchase");
    let view = repository
        .find(&order.order_id)
        .await
        .unwrap()
        .expect("Purchase should exist");

    assert_eq!(view.total_amount, Money::from_cents(2_550));
    assert_eq!(view.items.len(), 2);
    assert_eq!(view.items[0].product_id, ProductId::new("1"));
    assert!(view.is_consistent());

    let missing = repository.find(&OrderId::new("INV-missing")).await.unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_failed_item_rolls_back_whole_purchase() {
    let (_container, pool) = setup_pool().await;
    let repository = PostgresPurchaseRepository::new(pool.clone());

    let mut bad = line("2", 1, 550);
    bad.subtotal = Money::from_cents(1); // violates the subtotal CHECK
    let order = purchase(vec![line("1", 2, 1_000), bad]);

    let result = repository.insert(&order).await;
    assert!(matches!(result, Err(StoreError::Unavailable(_))));
    assert!(repository.find(&order.order_id).await.unwrap().is_none());

    let (items,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM purchase_items")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(items, 0, "No orphan items may survive a failed purchase");
}

#[tokio::test]
async fn test_seeding_uses_catalog_and_three_locations() {
    let (_container, pool) = setup_pool().await;
    insert_product(&pool, "A", "Alpha", "", Money::from_cents(100))
        .await
        .unwrap();
    insert_product(&pool, "B", "Beta", "", Money::from_cents(200))
        .await
        .unwrap();

    let mut rng = StdRng::seed_from_u64(42);
    let inserted = seed_inventory(&pool, &mut rng).await.unwrap();
    assert_eq!(inserted, 6);

    let rows: Vec<(String, String, i32)> =
        sqlx::query_as("SELECT product_id, location, stock FROM inventory ORDER BY product_id, location")
            .fetch_all(&pool)
            .await
            .unwrap();
    assert_eq!(rows.len(), 6);
    assert!(rows.iter().all(|(_, _, stock)| (1..=65).contains(stock)));
}

#[tokio::test]
async fn test_seeding_falls_back_to_default_ids() {
    let (_container, pool) = setup_pool().await;
    let mut rng = StdRng::seed_from_u64(42);
    let inserted = seed_inventory(&pool, &mut rng).await.unwrap();
    assert_eq!(inserted, 36);
}
