//! Prometheus metrics for observability and monitoring.
//!
//! Counters and histograms for:
//! - Simulator ticks (applied, skipped) and dropped inventory events
//! - Committed and failed purchase orders
//! - Encryption fallbacks (incremented by `shopfloor-vault`)
//!
//! The recorders below are plain functions over the global `metrics` facade, so they
//! are no-ops until [`MetricsRecorder::install`] has run.
//!
//! # Example
//!
//! ```rust,no_run
//! use shopfloor_runtime::metrics::MetricsRecorder;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut recorder = MetricsRecorder::new();
//! recorder.install()?;
//!
//! if let Some(text) = recorder.render() {
//!     println!("{text}");
//! }
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;
use thiserror::Error;

// Re-export metrics macros for use in other modules
pub use metrics::{counter, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus recorder.
///
/// Installs the global recorder and renders the exposition text on demand. Serving
/// it over HTTP is left to the embedding layer.
#[derive(Default)]
pub struct MetricsRecorder {
    handle: Option<PrometheusHandle>,
}

impl MetricsRecorder {
    /// Create an uninstalled recorder.
    #[must_use]
    pub const fn new() -> Self {
        Self { handle: None }
    }

    /// Register metric descriptions and install the Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed.
    ///
    /// # Note
    ///
    /// If a recorder is already installed (e.g., in tests), this logs a warning and
    /// returns `Ok` without a handle.
    pub fn install(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!("Metrics recorder installed");
                Ok(())
            }
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            }
        }
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if this instance did not install the recorder.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    // Simulator
    describe_counter!(
        "inventory_purchases_total",
        "Simulated purchases applied to the ledger"
    );
    describe_counter!(
        "inventory_restocks_total",
        "Simulated restocks applied to the ledger"
    );
    describe_counter!(
        "inventory_units_sold_total",
        "Units removed by simulated purchases"
    );
    describe_counter!(
        "inventory_units_restocked_total",
        "Units added by restocks"
    );
    describe_counter!(
        "inventory_ticks_skipped_total",
        "Generator ticks skipped because of a ledger error"
    );
    describe_counter!(
        "inventory_events_dropped_total",
        "Applied mutations whose event could not be recorded"
    );

    // Purchases
    describe_counter!("purchase_orders_total", "Purchase orders committed");
    describe_counter!(
        "purchase_orders_failed_total",
        "Purchase orders rejected or aborted"
    );
    describe_histogram!(
        "purchase_commit_duration_seconds",
        "Time taken to persist an order and its items"
    );

    // Encryption
    describe_counter!(
        "encryption_fallbacks_total",
        "Sensitive fields stored as fallback digests"
    );
}

/// Simulator and inventory metrics recorder.
pub struct InventoryMetrics;

impl InventoryMetrics {
    /// Record an applied simulated purchase.
    pub fn record_purchase(units: u32) {
        counter!("inventory_purchases_total").increment(1);
        counter!("inventory_units_sold_total").increment(u64::from(units));
    }

    /// Record an applied restock.
    pub fn record_restock(units: u32) {
        counter!("inventory_restocks_total").increment(1);
        counter!("inventory_units_restocked_total").increment(u64::from(units));
    }

    /// Record a skipped generator tick.
    pub fn record_skipped(generator: &'static str) {
        counter!("inventory_ticks_skipped_total", "generator" => generator).increment(1);
    }

    /// Record an event that failed to append.
    pub fn record_event_dropped() {
        counter!("inventory_events_dropped_total").increment(1);
    }
}

/// Purchase metrics recorder.
pub struct PurchaseMetrics;

impl PurchaseMetrics {
    /// Record a committed order.
    pub fn record_order(duration: Duration) {
        counter!("purchase_orders_total").increment(1);
        histogram!("purchase_commit_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record a failed order.
    pub fn record_failure(reason: &'static str) {
        counter!("purchase_orders_failed_total", "reason" => reason).increment(1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_recorder_creation() {
        let recorder = MetricsRecorder::new();
        assert!(recorder.render().is_none());
    }

    #[test]
    fn test_recorder_install_and_render() {
        let mut recorder = MetricsRecorder::new();
        recorder.install().unwrap();

        InventoryMetrics::record_purchase(2);
        PurchaseMetrics::record_order(Duration::from_millis(12));

        // Another test may have installed the recorder first
        if let Some(rendered) = recorder.render() {
            assert!(rendered.contains("inventory_purchases_total"));
            assert!(rendered.contains("purchase_orders_total"));
        }
    }
}
