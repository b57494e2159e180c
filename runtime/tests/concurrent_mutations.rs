//! Concurrent ledger traffic through the inventory service.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use futures::future::join_all;
use shopfloor_core::error::LedgerError;
use shopfloor_core::event::EventType;
use shopfloor_core::stock::StockKey;
use shopfloor_runtime::Inventory;
use shopfloor_testing::{InMemoryEventRecorder, InMemoryStockLedger, init_test_tracing, test_clock};
use std::sync::Arc;

fn inventory() -> (Inventory, InMemoryStockLedger, InMemoryEventRecorder) {
    init_test_tracing();
    let ledger = InMemoryStockLedger::new();
    let recorder = InMemoryEventRecorder::new();
    let inventory = Inventory::new(
        Arc::new(ledger.clone()),
        Arc::new(recorder.clone()),
        Arc::new(test_clock()),
    );
    (inventory, ledger, recorder)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_purchases_never_oversell() {
    let (inventory, ledger, recorder) = inventory();
    let key = StockKey::new("7", "main-store");
    ledger.set_stock(&key, 10);

    let tasks = (0..25).map(|_| {
        let inventory = inventory.clone();
        let key = key.clone();
        tokio::spawn(async move { inventory.purchase(&key, 1).await })
    });
    let results: Vec<_> = join_all(tasks).await.into_iter().map(|r| r.expect("task panicked")).collect();

    let applied = results.iter().filter(|r| r.is_ok()).count();
    let refused = results
        .iter()
        .filter(|r| matches!(r, Err(LedgerError::InsufficientStock { .. })))
        .count();

    assert_eq!(applied, 10);
    assert_eq!(refused, 15);
    assert_eq!(ledger.stock(&key), Some(0));

    // Each applied decrement saw a distinct previous value
    let mut previous: Vec<u32> = recorder.events().iter().map(|e| e.previous_stock).collect();
    previous.sort_unstable();
    assert_eq!(previous, (1..=10).collect::<Vec<_>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn interleaved_purchases_and_restocks_balance() {
    let (inventory, ledger, recorder) = inventory();
    let key = StockKey::new("2", "downtown-store");
    ledger.set_stock(&key, 50);

    let sells = (0..20).map(|_| {
        let inventory = inventory.clone();
        let key = key.clone();
        tokio::spawn(async move { inventory.purchase(&key, 2).await.map(|_| ()) })
    });
    let restocks = (0..5).map(|_| {
        let inventory = inventory.clone();
        let key = key.clone();
        tokio::spawn(async move { inventory.restock(&key, 4).await.map(|_| ()) })
    });

    for result in join_all(sells.chain(restocks)).await {
        result.expect("task panicked").expect("50 units cover every sale");
    }

    assert_eq!(ledger.stock(&key), Some(50 - 40 + 20));

    let events = recorder.events();
    assert_eq!(events.len(), 25);
    assert!(events.iter().all(|e| e.is_consistent()));
    assert_eq!(
        events.iter().filter(|e| e.event_type == EventType::Restock).count(),
        5
    );
}
