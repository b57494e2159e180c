//! Shopfloor Server
//!
//! This binary:
//! - Connects to `PostgreSQL` and runs migrations
//! - Optionally reseeds inventory
//! - Starts the purchase and restock simulator
//! - Runs until Ctrl+C or SIGTERM, then shuts down gracefully
//!
//! # Usage
//!
//! ```bash
//! docker compose up -d postgres
//! cargo run --bin shopfloor
//! ```

use shopfloor_server::{Application, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,shopfloor=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Shopfloor...");

    let config = Config::from_env()?;
    tracing::info!(
        db_host = %config.database.host,
        database = %config.database.database,
        simulator = config.simulator.enabled,
        vault = config.vault.is_some(),
        "Configuration loaded"
    );

    let app = Application::build(config).await?;
    app.run().await
}
