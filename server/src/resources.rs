//! Resource management for infrastructure setup.
//!
//! Centralizes everything the services need from the outside world: the
//! connection pool (migrated and optionally seeded), the clock, and the encryption
//! provider.
//!
//! # Example
//!
//! ```rust,ignore
//! let config = Config::from_env()?;
//! let resources = ResourceManager::from_config(&config).await?;
//! ```

use crate::config::Config;
use rand::SeedableRng;
use rand::rngs::StdRng;
use shopfloor_core::encryption::Encryptor;
use shopfloor_core::environment::SystemClock;
use shopfloor_vault::{EncryptionProvider, TransitClient};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};

/// Infrastructure shared by every service.
#[derive(Clone)]
pub struct ResourceManager {
    /// Application configuration
    pub config: Arc<Config>,

    /// System clock for timestamps
    pub clock: Arc<SystemClock>,

    /// Store connection pool, closed at shutdown
    pub pool: PgPool,

    /// Vault Transit with digest fallback
    pub encryption: EncryptionProvider,
}

impl ResourceManager {
    /// Initialize all infrastructure resources from configuration.
    ///
    /// This method:
    /// 1. Connects to `PostgreSQL`
    /// 2. Runs database migrations
    /// 3. Reseeds inventory when `SEED_INVENTORY` is set
    /// 4. Builds the Transit client when `VAULT_ADDR` is set
    ///
    /// # Errors
    ///
    /// Returns error if the database is unreachable, migrations or seeding fail, or
    /// the Transit HTTP client cannot be built.
    pub async fn from_config(config: &Config) -> Result<Self, Box<dyn std::error::Error>> {
        info!("Connecting to database...");
        let pool = shopfloor_postgres::connect(&config.database).await?;

        info!("Running migrations...");
        shopfloor_postgres::migrate(&pool).await?;

        if config.simulator.seed_inventory {
            let mut rng = StdRng::from_entropy();
            let rows = shopfloor_postgres::seed_inventory(&pool, &mut rng).await?;
            info!(rows, "Inventory seeded");
        }

        let encryption = match &config.vault {
            Some(vault) => {
                let mut vault = vault.clone();
                vault.key_name.clone_from(&config.key_name);
                let client = TransitClient::new(vault)?;
                info!(addr = %client.config().addr, "Vault Transit encryption enabled");
                EncryptionProvider::new(Arc::new(client) as Arc<dyn Encryptor>)
            }
            None => {
                warn!("VAULT_ADDR not set, sensitive fields will be stored as digests");
                EncryptionProvider::fallback_only()
            }
        };

        Ok(Self {
            config: Arc::new(config.clone()),
            clock: Arc::new(SystemClock),
            pool,
            encryption,
        })
    }
}
