//! Connection pool lifecycle.
//!
//! The pool is built once at startup from discrete connection parameters, handed to
//! every store, and closed explicitly at shutdown.

use shopfloor_core::error::StoreError;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use std::time::Duration;

/// Connection parameters and pool sizing.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Role to connect as
    pub user: String,
    /// Role password
    pub password: String,
    /// Database name
    pub database: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of idle connections in the pool
    pub min_connections: u32,
    /// Time to wait for a connection before failing
    pub connect_timeout: Duration,
    /// Connections idle longer than this are closed
    pub idle_timeout: Duration,
    /// Connections older than this are recycled
    pub max_lifetime: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: "postgres".to_string(),
            database: "shopfloor".to_string(),
            max_connections: 25,
            min_connections: 5,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(60),
            max_lifetime: Duration::from_secs(300),
        }
    }
}

impl DatabaseConfig {
    /// Connection options. Parameters are passed individually, so no escaping is
    /// needed for passwords with reserved characters.
    #[must_use]
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
    }
}

/// Opens a connection pool and verifies it with a round trip.
///
/// # Errors
///
/// Returns [`StoreError::Unavailable`] if no connection could be established.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, StoreError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.connect_timeout)
        .idle_timeout(Some(config.idle_timeout))
        .max_lifetime(Some(config.max_lifetime))
        .connect_with(config.connect_options())
        .await
        .map_err(|e| StoreError::Unavailable(format!("Failed to connect to database: {e}")))?;

    ping(&pool).await?;

    tracing::info!(
        host = %config.host,
        port = config.port,
        database = %config.database,
        max_connections = config.max_connections,
        "Connected to database"
    );

    Ok(pool)
}

/// Runs the embedded schema migrations.
///
/// # Errors
///
/// Returns [`StoreError::Unavailable`] if a migration fails.
pub async fn migrate(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| StoreError::Unavailable(format!("Migration failed: {e}")))?;

    tracing::info!("Database schema up to date");
    Ok(())
}

/// Health check: a single `SELECT 1`.
///
/// # Errors
///
/// Returns [`StoreError::Unavailable`] if the round trip fails.
pub async fn ping(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(|e| StoreError::Unavailable(format!("Failed to ping database: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pool_sizing() {
        let config = DatabaseConfig::default();
        assert_eq!(config.max_connections, 25);
        assert_eq!(config.min_connections, 5);
        assert_eq!(config.max_lifetime, Duration::from_secs(300));
        assert_eq!(config.idle_timeout, Duration::from_secs(60));
    }
}
