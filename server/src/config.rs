//! Configuration management for the Shopfloor server.
//!
//! Loads configuration from environment variables with sensible defaults. Malformed
//! numbers and flags are logged and replaced by their default; a malformed simulator
//! interval stops startup.

use shopfloor_postgres::DatabaseConfig;
use shopfloor_runtime::SimulatorConfig;
use shopfloor_vault::VaultConfig;
use shopfloor_vault::client::DEFAULT_KEY_NAME;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors that prevent startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An interval variable could not be parsed.
    #[error("Invalid {name}: {value:?} (expected e.g. 250ms, 3s, 2m or a number of seconds)")]
    InvalidInterval {
        /// Variable name
        name: &'static str,
        /// Raw value
        value: String,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// `PostgreSQL` connection pool
    pub database: DatabaseConfig,
    /// Background simulator
    pub simulator: SimulatorSettings,
    /// Vault Transit; `None` stores digests instead of ciphertext
    pub vault: Option<VaultConfig>,
    /// Transit key for purchase fields
    pub key_name: String,
    /// Process settings
    pub server: ServerConfig,
}

/// Simulator configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatorSettings {
    /// Run the generators at all
    pub enabled: bool,
    /// Reset inventory rows at startup
    pub seed_inventory: bool,
    /// Generator intervals
    pub intervals: SimulatorConfig,
}

/// Server configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    /// Grace period for in-flight work and background tasks at shutdown
    pub shutdown_timeout: Duration,
    /// Install the Prometheus recorder
    pub metrics_enabled: bool,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidInterval`] if `PURCHASE_INTERVAL` or
    /// `RESTOCK_INTERVAL` is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration, reading each variable through `lookup`.
    ///
    /// # Errors
    ///
    /// See [`from_env`](Self::from_env).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let db = DatabaseConfig::default();
        let database = DatabaseConfig {
            host: lookup("DB_HOST").unwrap_or(db.host),
            port: parse_or(&lookup, "DB_PORT", db.port),
            user: lookup("DB_USER").unwrap_or(db.user),
            password: lookup("DB_PASSWORD").unwrap_or(db.password),
            database: lookup("DB_NAME").unwrap_or(db.database),
            max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", db.max_connections),
            min_connections: parse_or(&lookup, "DB_MIN_CONNECTIONS", db.min_connections),
            connect_timeout: seconds_or(&lookup, "DB_CONNECT_TIMEOUT", db.connect_timeout),
            idle_timeout: seconds_or(&lookup, "DB_IDLE_TIMEOUT", db.idle_timeout),
            max_lifetime: seconds_or(&lookup, "DB_MAX_LIFETIME", db.max_lifetime),
        };

        let defaults = SimulatorConfig::default();
        let simulator = SimulatorSettings {
            enabled: parse_or(&lookup, "SIMULATOR_ENABLED", true),
            seed_inventory: parse_or(&lookup, "SEED_INVENTORY", true),
            intervals: SimulatorConfig {
                purchase_interval: interval_or(
                    &lookup,
                    "PURCHASE_INTERVAL",
                    defaults.purchase_interval,
                )?,
                restock_interval: interval_or(&lookup, "RESTOCK_INTERVAL", defaults.restock_interval)?,
            },
        };

        Ok(Self {
            database,
            simulator,
            vault: VaultConfig::from_lookup(&lookup),
            key_name: lookup("VAULT_KEY_NAME")
                .filter(|k| !k.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_KEY_NAME.to_string()),
            server: ServerConfig {
                shutdown_timeout: seconds_or(&lookup, "SHUTDOWN_TIMEOUT", Duration::from_secs(10)),
                metrics_enabled: parse_or(&lookup, "METRICS_ENABLED", false),
            },
        })
    }
}

/// Parses `250ms`, `3s`, `2m` or a bare number of seconds. Zero is rejected.
#[must_use]
pub fn parse_interval(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let duration = if let Some(ms) = raw.strip_suffix("ms") {
        Duration::from_millis(ms.trim().parse().ok()?)
    } else if let Some(secs) = raw.strip_suffix('s') {
        Duration::from_secs(secs.trim().parse().ok()?)
    } else if let Some(mins) = raw.strip_suffix('m') {
        Duration::from_secs(mins.trim().parse::<u64>().ok()?.checked_mul(60)?)
    } else {
        Duration::from_secs(raw.parse().ok()?)
    };
    (!duration.is_zero()).then_some(duration)
}

fn parse_or<T: FromStr + Copy>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> T {
    match lookup(name) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(variable = name, value = %raw, "Invalid value, using default");
            default
        }),
    }
}

fn seconds_or(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: Duration) -> Duration {
    Duration::from_secs(parse_or(lookup, name, default.as_secs()))
}

fn interval_or(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(raw) => parse_interval(&raw).ok_or(ConfigError::InvalidInterval { name, value: raw }),
    }
}
