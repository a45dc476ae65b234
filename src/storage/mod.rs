//! # Storage and Persistence
//!
//! Database connectivity and the persistence layer for secrets, users,
//! access logs, sharing records, and audit events.

pub mod pool;
pub mod repositories;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use crate::config::DatabaseConfig;
pub use pool::{create_pool, DbPool};
pub use repositories::{
    AccessLogEntry, AccessLogRepository, AuditEvent, AuditLogEntry, AuditLogRepository, NewAccessLogEntry,
    NewSecret, NewSharedSecret, NewUser, SecretRepository, SecretUpdate, ShareRepository, SharedSecret,
    SqlxAccessLogRepository, SqlxSecretRepository, SqlxShareRepository, SqlxUserRepository, User,
    UserRepository,
};

use crate::errors::{Result, SecureShareError};

/// Run embedded database migrations
pub async fn run_migrations(pool: &DbPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| SecureShareError::internal(format!("Failed to run migrations: {}", e)))?;

    tracing::info!("Database migrations applied");
    Ok(())
}

/// Check database connectivity
pub async fn check_connection(pool: &DbPool) -> Result<()> {
    sqlx::query("SELECT 1").fetch_one(pool).await.map_err(|e| SecureShareError::Database {
        source: e,
        context: "Database connectivity check failed".to_string(),
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_migrations_and_connectivity() {
        let pool = test_helpers::test_pool().await;
        check_connection(&pool).await.unwrap();

        // Migrated tables are present
        sqlx::query("SELECT COUNT(*) FROM secrets").fetch_one(&pool).await.unwrap();
        sqlx::query("SELECT COUNT(*) FROM access_logs").fetch_one(&pool).await.unwrap();
        sqlx::query("SELECT COUNT(*) FROM audit_log").fetch_one(&pool).await.unwrap();
    }
}
