//! # Database Connection Pool Management
//!
//! Provides database connection pool creation and management utilities.

use crate::config::DatabaseConfig;
use crate::errors::{Result, SecureShareError};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    Pool, Sqlite,
};
use std::{str::FromStr, time::Duration};

/// Type alias for the database connection pool
pub type DbPool = Pool<Sqlite>;

const SQLITE_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Create a database connection pool with the specified configuration
pub async fn create_pool(config: &DatabaseConfig) -> Result<DbPool> {
    validate_config(config)?;

    let pool_options = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.connect_timeout())
        .test_before_acquire(true);

    let pool_options = if let Some(idle_timeout) = config.idle_timeout() {
        pool_options.idle_timeout(idle_timeout)
    } else {
        pool_options
    };

    let connect_options = SqliteConnectOptions::from_str(&config.url)
        .map_err(|e| SecureShareError::Database {
            source: e,
            context: format!("Invalid SQLite connection string: {}", config.url),
        })?
        .create_if_missing(true)
        .busy_timeout(SQLITE_BUSY_TIMEOUT)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true);

    let pool =
        pool_options.connect_with(connect_options).await.map_err(|e| SecureShareError::Database {
            source: e,
            context: format!("Failed to connect to database: {}", config.url),
        })?;

    tracing::info!(
        url = %config.url,
        max_connections = config.max_connections,
        "Database connection pool created"
    );

    Ok(pool)
}

fn validate_config(config: &DatabaseConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(SecureShareError::validation("Database URL cannot be empty"));
    }

    if config.min_connections > config.max_connections {
        return Err(SecureShareError::validation(
            "Min connections cannot exceed max connections",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_in_memory_pool() {
        let config = DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        };

        let pool = create_pool(&config).await.unwrap();
        sqlx::query("SELECT 1").fetch_one(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn test_create_file_pool() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            url: format!("sqlite://{}/test.db", dir.path().display()),
            max_connections: 2,
            ..Default::default()
        };

        let pool = create_pool(&config).await.unwrap();
        sqlx::query("SELECT 1").fetch_one(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_connection_bounds_rejected() {
        let config = DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 5,
            ..Default::default()
        };

        assert!(create_pool(&config).await.is_err());
    }
}
