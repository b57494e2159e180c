//! Application lifecycle management and graceful shutdown.
//!
//! # Graceful Shutdown
//!
//! When a shutdown signal is received (Ctrl+C or SIGTERM):
//! 1. The in-flight gate closes, so new purchases fail with `ShuttingDown`
//! 2. Purchases already admitted get `SHUTDOWN_TIMEOUT` to finish
//! 3. Shutdown signal broadcast to the simulator generators
//! 4. The generators share one more such bound to finish their current tick
//! 5. The connection pool is closed
//!
//! # Example
//!
//! ```rust,ignore
//! let app = Application::build(Config::from_env()?).await?;
//! let shopfloor = app.shopfloor().clone(); // hand to the HTTP layer
//! app.run().await?;
//! ```

use crate::app::Shopfloor;
use crate::config::Config;
use crate::resources::ResourceManager;
use shopfloor_runtime::{InFlight, MetricsRecorder, Simulator};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Running application with all background tasks.
pub struct Application {
    shopfloor: Shopfloor,
    gate: InFlight,
    simulator: Option<Simulator>,
    shutdown_tx: broadcast::Sender<()>,
    pool: PgPool,
    config: Arc<Config>,
}

impl Application {
    /// Boots resources, wires the services and starts the simulator.
    ///
    /// # Errors
    ///
    /// Returns error if resources cannot be initialized or the metrics recorder
    /// cannot be installed.
    pub async fn build(config: Config) -> Result<Self, Box<dyn std::error::Error>> {
        let resources = ResourceManager::from_config(&config).await?;
        let gate = InFlight::new();
        let mut shopfloor = Shopfloor::from_resources(&resources, gate.clone());

        if config.server.metrics_enabled {
            let mut recorder = MetricsRecorder::new();
            recorder.install()?;
            shopfloor = shopfloor.with_metrics(Arc::new(recorder));
        }

        let (shutdown_tx, _) = broadcast::channel(1);
        let simulator = if config.simulator.enabled {
            info!(
                purchase_interval = ?config.simulator.intervals.purchase_interval,
                restock_interval = ?config.simulator.intervals.restock_interval,
                "Starting inventory simulator"
            );
            Some(Simulator::spawn(
                shopfloor.inventory(),
                &config.simulator.intervals,
                &shutdown_tx,
            ))
        } else {
            info!("Inventory simulator disabled");
            None
        };

        Ok(Self {
            shopfloor,
            gate,
            simulator,
            shutdown_tx,
            pool: resources.pool,
            config: resources.config,
        })
    }

    /// The facade to hand to the HTTP layer.
    #[must_use]
    pub const fn shopfloor(&self) -> &Shopfloor {
        &self.shopfloor
    }

    /// Run until a shutdown signal is received, then shut down gracefully.
    ///
    /// # Errors
    ///
    /// Currently infallible; the signature leaves room for serving errors.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        info!("Shopfloor is running, press Ctrl+C to stop");
        shutdown_signal().await;

        info!("Initiating graceful shutdown...");
        let clean = stop_workers(
            &self.gate,
            self.simulator,
            &self.shutdown_tx,
            self.config.server.shutdown_timeout,
        )
        .await;

        self.pool.close().await;
        info!(clean, "Graceful shutdown complete");
        Ok(())
    }
}

/// Closes `gate`, drains it, then stops the simulator, each within `grace`.
///
/// Returns `true` if nothing had to be abandoned.
pub async fn stop_workers(
    gate: &InFlight,
    simulator: Option<Simulator>,
    shutdown_tx: &broadcast::Sender<()>,
    grace: Duration,
) -> bool {
    gate.close();
    let drained = gate.drain(grace).await;
    if drained {
        info!("In-flight purchases finished");
    }

    // No receivers when the simulator is disabled
    let _ = shutdown_tx.send(());

    let stopped = match simulator {
        Some(simulator) => simulator.join(grace).await,
        None => true,
    };

    drained && stopped
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        () = terminate => {
            info!("Received SIGTERM signal");
        }
    }
}
