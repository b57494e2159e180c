//! Simulation scheduler.
//!
//! Two generators mutate the ledger on independent fixed intervals:
//!
//! - **Purchase**: picks a random in-stock row and sells 1 to 3 units of it
//!   (never more than the row holds).
//! - **Restock**: picks the emptiest row at or below [`LOW_STOCK_THRESHOLD`] and adds
//!   a tiered amount that depends on how empty it was.
//!
//! The generators share nothing but the ledger. A tick that loses a race for the
//! last units is skipped, never retried.
//!
//! # Example
//!
//! ```rust,no_run
//! use shopfloor_runtime::inventory::Inventory;
//! use shopfloor_runtime::simulator::{Simulator, SimulatorConfig};
//! use std::time::Duration;
//! use tokio::sync::broadcast;
//!
//! # async fn example(inventory: Inventory) {
//! let (shutdown_tx, _) = broadcast::channel(1);
//! let simulator = Simulator::spawn(&inventory, &SimulatorConfig::default(), &shutdown_tx);
//!
//! // ... later
//! let _ = shutdown_tx.send(());
//! simulator.join(Duration::from_secs(10)).await;
//! # }
//! ```

use crate::inventory::Inventory;
use crate::metrics::InventoryMetrics;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shopfloor_core::error::LedgerError;
use shopfloor_core::event::InventoryEvent;
use shopfloor_core::stock::{LOW_STOCK_THRESHOLD, StockRecord};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Most units a single simulated purchase takes.
pub const MAX_PURCHASE_QUANTITY: u32 = 3;

/// Units sold by one simulated purchase: uniform in `1..=min(3, stock)`.
///
/// Returns `None` for an empty row.
pub fn purchase_quantity<R: Rng + ?Sized>(rng: &mut R, stock: u32) -> Option<u32> {
    let max = stock.min(MAX_PURCHASE_QUANTITY);
    (max > 0).then(|| rng.gen_range(1..=max))
}

/// Units added by one restock, tiered on the row's current stock.
///
/// | stock | units |
/// |---|---|
/// | 0 | 20 to 50 |
/// | 1 to 5 | 15 to 35 |
/// | 6 to 10 | 10 to 25 |
///
/// Returns `None` above [`LOW_STOCK_THRESHOLD`].
pub fn restock_amount<R: Rng + ?Sized>(rng: &mut R, stock: u32) -> Option<u32> {
    match stock {
        0 => Some(rng.gen_range(20..=50)),
        1..=5 => Some(rng.gen_range(15..=35)),
        s if s <= LOW_STOCK_THRESHOLD => Some(rng.gen_range(10..=25)),
        _ => None,
    }
}

/// Result of one generator tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// A mutation was applied; the event describes it.
    Applied(InventoryEvent),
    /// No row qualified.
    Idle,
    /// A row was chosen but the mutation failed.
    Skipped(String),
}

/// Future returned by [`Generator::tick`].
pub type TickFuture<'a> = Pin<Box<dyn Future<Output = TickOutcome> + Send + 'a>>;

/// One unit of periodic work.
pub trait Generator: Send {
    /// Name used in logs and metric labels.
    fn name(&self) -> &'static str;

    /// Runs a single tick.
    fn tick(&mut self) -> TickFuture<'_>;
}

/// Sells a few units of a random in-stock row.
pub struct PurchaseGenerator {
    inventory: Inventory,
    rng: StdRng,
}

impl PurchaseGenerator {
    /// Generator seeded from OS entropy.
    #[must_use]
    pub fn new(inventory: Inventory) -> Self {
        Self::with_rng(inventory, StdRng::from_entropy())
    }

    /// Generator with an explicit random source.
    #[must_use]
    pub const fn with_rng(inventory: Inventory, rng: StdRng) -> Self {
        Self { inventory, rng }
    }

    async fn run(&mut self) -> TickOutcome {
        let candidate = match self.inventory.ledger().sample_in_stock().await {
            Ok(Some(record)) => record,
            Ok(None) => {
                info!("No items in stock for purchase");
                return TickOutcome::Idle;
            }
            Err(e) => return skip(self.name(), &e),
        };

        let Some(quantity) = purchase_quantity(&mut self.rng, candidate.quantity) else {
            return TickOutcome::Idle;
        };

        match self.inventory.purchase(&candidate.key, quantity).await {
            Ok(event) => {
                InventoryMetrics::record_purchase(quantity);
                info!(
                    product_id = %event.product_id,
                    location = %event.location,
                    quantity,
                    previous_stock = event.previous_stock,
                    new_stock = event.new_stock,
                    "PURCHASE: sold {quantity} units{}",
                    purchase_status(event.new_stock)
                );
                TickOutcome::Applied(event)
            }
            Err(e) => skip(self.name(), &e),
        }
    }
}

impl Generator for PurchaseGenerator {
    fn name(&self) -> &'static str {
        "purchase"
    }

    fn tick(&mut self) -> TickFuture<'_> {
        Box::pin(self.run())
    }
}

/// Tops up the emptiest low-stock row.
pub struct RestockGenerator {
    inventory: Inventory,
    rng: StdRng,
}

impl RestockGenerator {
    /// Generator seeded from OS entropy.
    #[must_use]
    pub fn new(inventory: Inventory) -> Self {
        Self::with_rng(inventory, StdRng::from_entropy())
    }

    /// Generator with an explicit random source.
    #[must_use]
    pub const fn with_rng(inventory: Inventory, rng: StdRng) -> Self {
        Self { inventory, rng }
    }

    async fn run(&mut self) -> TickOutcome {
        let candidate: StockRecord =
            match self.inventory.ledger().lowest_stock(LOW_STOCK_THRESHOLD).await {
                Ok(Some(record)) => record,
                Ok(None) => {
                    info!("RESTOCK: No low stock items need restocking");
                    return TickOutcome::Idle;
                }
                Err(e) => return skip(self.name(), &e),
            };

        let Some(amount) = restock_amount(&mut self.rng, candidate.quantity) else {
            return TickOutcome::Idle;
        };

        match self.inventory.restock(&candidate.key, amount).await {
            Ok(event) => {
                InventoryMetrics::record_restock(amount);
                info!(
                    product_id = %event.product_id,
                    location = %event.location,
                    amount,
                    previous_stock = event.previous_stock,
                    new_stock = event.new_stock,
                    "RESTOCK: added {amount} units ({})",
                    restock_reason(event.previous_stock)
                );
                TickOutcome::Applied(event)
            }
            Err(e) => skip(self.name(), &e),
        }
    }
}

impl Generator for RestockGenerator {
    fn name(&self) -> &'static str {
        "restock"
    }

    fn tick(&mut self) -> TickFuture<'_> {
        Box::pin(self.run())
    }
}

const fn purchase_status(new_stock: u32) -> &'static str {
    match new_stock {
        0 => " - OUT OF STOCK",
        1..=5 => " - LOW STOCK",
        _ => "",
    }
}

const fn restock_reason(previous_stock: u32) -> &'static str {
    match previous_stock {
        0 => "OUT OF STOCK EMERGENCY",
        1..=5 => "LOW STOCK ALERT",
        _ => "LOW STOCK",
    }
}

fn skip(generator: &'static str, error: &LedgerError) -> TickOutcome {
    InventoryMetrics::record_skipped(generator);
    match error {
        LedgerError::InsufficientStock { .. } => {
            debug!(generator, error = %error, "Lost race for stock, skipping tick");
        }
        _ => warn!(generator, error = %error, "Generator tick failed, skipping"),
    }
    TickOutcome::Skipped(error.to_string())
}

/// Generator intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatorConfig {
    /// Time between purchase ticks
    pub purchase_interval: Duration,
    /// Time between restock ticks
    pub restock_interval: Duration,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            purchase_interval: Duration::from_secs(3),
            restock_interval: Duration::from_secs(15),
        }
    }
}

/// Handles of the running generator tasks.
#[derive(Debug)]
pub struct Simulator {
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl Simulator {
    /// Spawns both generators, seeded from OS entropy.
    ///
    /// Each runs until a message (or close) arrives on `shutdown`, finishing its
    /// current tick first.
    #[must_use]
    pub fn spawn(
        inventory: &Inventory,
        config: &SimulatorConfig,
        shutdown: &broadcast::Sender<()>,
    ) -> Self {
        let purchase = PurchaseGenerator::new(inventory.clone());
        let restock = RestockGenerator::new(inventory.clone());

        Self {
            handles: vec![
                (
                    purchase.name(),
                    spawn_generator(purchase, config.purchase_interval, shutdown.subscribe()),
                ),
                (
                    restock.name(),
                    spawn_generator(restock, config.restock_interval, shutdown.subscribe()),
                ),
            ],
        }
    }

    /// Waits for every generator to stop, all within one overall `timeout`.
    ///
    /// Generators still running at the deadline are aborted. Returns `true` if all
    /// stopped cleanly.
    pub async fn join(self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut clean = true;
        for (name, mut handle) in self.handles {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(())) => info!(generator = name, "Generator stopped gracefully"),
                Ok(Err(e)) => {
                    warn!(generator = name, error = %e, "Generator task failed");
                    clean = false;
                }
                Err(_) => {
                    warn!(generator = name, "Generator shutdown timed out, aborting");
                    handle.abort();
                    clean = false;
                }
            }
        }
        clean
    }
}

/// Runs `generator` every `period`, first tick one period after start.
pub fn spawn_generator<G: Generator + 'static>(
    mut generator: G,
    period: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    // interval_at panics on a zero period
    let period = period.max(Duration::from_millis(1));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            generator = generator.name(),
            interval_ms = u64::try_from(period.as_millis()).unwrap_or(u64::MAX),
            "Generator started"
        );

        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = ticker.tick() => {
                    generator.tick().await;
                }
            }
        }

        debug!(generator = generator.name(), "Generator loop exited");
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use shopfloor_core::event::EventType;
    use shopfloor_core::stock::StockKey;
    use shopfloor_testing::{InMemoryEventRecorder, InMemoryStockLedger, test_clock};
    use std::sync::Arc;

    fn inventory() -> (Inventory, InMemoryStockLedger, InMemoryEventRecorder) {
        let ledger = InMemoryStockLedger::new();
        let recorder = InMemoryEventRecorder::new();
        let inventory = Inventory::new(
            Arc::new(ledger.clone()),
            Arc::new(recorder.clone()),
            Arc::new(test_clock()),
        );
        (inventory, ledger, recorder)
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    proptest! {
        #[test]
        fn purchase_quantity_stays_within_stock(stock in 1u32..10_000, seed in any::<u64>()) {
            let q = purchase_quantity(&mut StdRng::seed_from_u64(seed), stock).unwrap();
            prop_assert!(q >= 1);
            prop_assert!(q <= stock.min(3));
        }

        #[test]
        fn restock_amount_follows_tiers(stock in 0u32..=10, seed in any::<u64>()) {
            let amount = restock_amount(&mut StdRng::seed_from_u64(seed), stock).unwrap();
            let range = match stock {
                0 => 20..=50,
                1..=5 => 15..=35,
                _ => 10..=25,
            };
            prop_assert!(range.contains(&amount));
        }

        #[test]
        fn healthy_rows_get_no_restock(stock in 11u32.., seed in any::<u64>()) {
            prop_assert_eq!(restock_amount(&mut StdRng::seed_from_u64(seed), stock), None);
        }
    }

    #[test]
    fn empty_row_cannot_be_purchased() {
        assert_eq!(purchase_quantity(&mut rng(), 0), None);
        assert_eq!(purchase_quantity(&mut rng(), 1), Some(1));
    }

    #[tokio::test]
    async fn purchase_from_row_with_two_units() {
        let (inventory, ledger, recorder) = inventory();
        let key = StockKey::new("7", "main-store");
        ledger.set_stock(&key, 2);

        let mut generator = PurchaseGenerator::with_rng(inventory, rng());
        let TickOutcome::Applied(event) = generator.tick().await else {
            panic!("expected an applied purchase");
        };

        assert_eq!(event.event_type, EventType::Purchase);
        assert_eq!(event.previous_stock, 2);
        assert!(event.new_stock < 2);
        assert!(event.quantity_change == -1 || event.quantity_change == -2);
        assert!(event.is_consistent());
        assert_eq!(ledger.stock(&key), Some(event.new_stock));
        assert_eq!(recorder.len(), 1);
    }

    #[tokio::test]
    async fn purchase_idles_when_everything_is_sold_out() {
        let (inventory, ledger, recorder) = inventory();
        ledger.set_stock(&StockKey::new("1", "mall-store"), 0);

        let mut generator = PurchaseGenerator::with_rng(inventory, rng());
        assert_eq!(generator.tick().await, TickOutcome::Idle);
        assert!(recorder.is_empty());
    }

    #[tokio::test]
    async fn restock_prefers_the_empty_row() {
        let (inventory, ledger, _recorder) = inventory();
        let empty = StockKey::new("3", "downtown-store");
        ledger.set_stock(&empty, 0);
        ledger.set_stock(&StockKey::new("4", "downtown-store"), 8);
        ledger.set_stock(&StockKey::new("5", "mall-store"), 40);

        let mut generator = RestockGenerator::with_rng(inventory, rng());
        let TickOutcome::Applied(event) = generator.tick().await else {
            panic!("expected an applied restock");
        };

        assert_eq!(event.key(), empty);
        assert_eq!(event.event_type, EventType::Restock);
        assert_eq!(event.previous_stock, 0);
        assert!((20..=50).contains(&event.new_stock));
        assert_eq!(ledger.stock(&empty), Some(event.new_stock));
    }

    #[tokio::test]
    async fn restock_ignores_healthy_rows() {
        let (inventory, ledger, recorder) = inventory();
        let key = StockKey::new("5", "mall-store");
        ledger.set_stock(&key, 11);

        let mut generator = RestockGenerator::with_rng(inventory, rng());
        assert_eq!(generator.tick().await, TickOutcome::Idle);
        assert_eq!(ledger.stock(&key), Some(11));
        assert!(recorder.is_empty());
    }

    #[tokio::test]
    async fn ledger_failure_skips_tick() {
        let (inventory, ledger, _recorder) = inventory();
        ledger.set_stock(&StockKey::new("1", "main-store"), 5);
        ledger.fail_with("connection reset");

        let mut generator = PurchaseGenerator::with_rng(inventory, rng());
        assert!(matches!(generator.tick().await, TickOutcome::Skipped(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn scheduler_ticks_until_shutdown() {
        let (inventory, ledger, recorder) = inventory();
        let key = StockKey::new("9", "main-store");
        ledger.set_stock(&key, 500);

        let (shutdown_tx, _) = broadcast::channel(1);
        let simulator = Simulator::spawn(&inventory, &SimulatorConfig::default(), &shutdown_tx);

        // Three purchase periods, no restock period yet
        tokio::time::sleep(Duration::from_millis(10_500)).await;
        shutdown_tx.send(()).unwrap();
        assert!(simulator.join(Duration::from_secs(1)).await);

        let events = recorder.events();
        assert!(!events.is_empty());
        assert!(events.len() <= 3);
        assert!(events.iter().all(|e| e.event_type == EventType::Purchase));
        let sold: i64 = events.iter().map(|e| -e.quantity_change).sum();
        assert_eq!(i64::from(ledger.stock(&key).unwrap()), 500 - sold);
    }

    struct StuckGenerator;

    impl Generator for StuckGenerator {
        fn name(&self) -> &'static str {
            "stuck"
        }

        fn tick(&mut self) -> TickFuture<'_> {
            Box::pin(std::future::pending())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn join_shares_one_deadline_across_generators() {
        let (shutdown_tx, _) = broadcast::channel(1);
        let period = Duration::from_millis(1);
        let simulator = Simulator {
            handles: (0..2)
                .map(|_| ("stuck", spawn_generator(StuckGenerator, period, shutdown_tx.subscribe())))
                .collect(),
        };

        // Both are now parked inside a tick that never finishes
        tokio::time::sleep(Duration::from_millis(10)).await;
        shutdown_tx.send(()).unwrap();

        let started = Instant::now();
        assert!(!simulator.join(Duration::from_secs(1)).await);
        assert!(started.elapsed() < Duration::from_millis(1_500));
    }
}
