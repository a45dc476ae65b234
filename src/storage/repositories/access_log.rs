//! Access log repository.
//!
//! Append-only audit of access attempts. Entries are never updated or
//! deleted by the core.

use crate::domain::{AccessLogId, SecretId, UserId};
use crate::errors::{Result, SecureShareError};
use crate::storage::DbPool;
use async_trait::async_trait;
use sqlx::FromRow;
use tracing::instrument;

#[derive(Debug, Clone, FromRow)]
struct AccessLogRow {
    pub id: String,
    pub secret_id: String,
    pub user_id: Option<String>,
    pub ip_address: String,
    pub user_agent: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// One recorded access attempt
#[derive(Debug, Clone, PartialEq)]
pub struct AccessLogEntry {
    pub id: AccessLogId,
    pub secret_id: SecretId,
    pub user_id: Option<UserId>,
    pub ip_address: String,
    pub user_agent: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<AccessLogRow> for AccessLogEntry {
    fn from(row: AccessLogRow) -> Self {
        Self {
            id: AccessLogId::from_string(row.id),
            secret_id: SecretId::from_string(row.secret_id),
            user_id: row.user_id.map(UserId::from_string),
            ip_address: row.ip_address,
            user_agent: row.user_agent,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewAccessLogEntry {
    pub secret_id: SecretId,
    pub user_id: Option<UserId>,
    pub ip_address: String,
    pub user_agent: String,
}

#[async_trait]
pub trait AccessLogRepository: Send + Sync {
    async fn append(&self, entry: NewAccessLogEntry) -> Result<AccessLogEntry>;
    async fn list_for_secret(
        &self,
        secret_id: &SecretId,
        limit: i64,
    ) -> Result<Vec<AccessLogEntry>>;
}

#[derive(Debug, Clone)]
pub struct SqlxAccessLogRepository {
    pool: DbPool,
}

impl SqlxAccessLogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccessLogRepository for SqlxAccessLogRepository {
    #[instrument(skip(self, entry), fields(secret_id = %entry.secret_id), name = "db_append_access_log")]
    async fn append(&self, entry: NewAccessLogEntry) -> Result<AccessLogEntry> {
        let id = AccessLogId::new();
        let now = chrono::Utc::now();

        sqlx::query(
            "INSERT INTO access_logs (id, secret_id, user_id, ip_address, user_agent, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&entry.secret_id)
        .bind(&entry.user_id)
        .bind(&entry.ip_address)
        .bind(&entry.user_agent)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, secret_id = %entry.secret_id, "Failed to append access log");
            SecureShareError::Database {
                source: e,
                context: format!("Failed to append access log for secret '{}'", entry.secret_id),
            }
        })?;

        Ok(AccessLogEntry {
            id,
            secret_id: entry.secret_id,
            user_id: entry.user_id,
            ip_address: entry.ip_address,
            user_agent: entry.user_agent,
            created_at: now,
        })
    }

    #[instrument(skip(self), fields(secret_id = %secret_id), name = "db_list_access_logs")]
    async fn list_for_secret(
        &self,
        secret_id: &SecretId,
        limit: i64,
    ) -> Result<Vec<AccessLogEntry>> {
        let rows = sqlx::query_as::<_, AccessLogRow>(
            "SELECT id, secret_id, user_id, ip_address, user_agent, created_at \
             FROM access_logs WHERE secret_id = ? ORDER BY created_at DESC LIMIT ?",
        )
        .bind(secret_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| SecureShareError::Database {
            source: e,
            context: format!("Failed to list access logs for secret '{}'", secret_id),
        })?;

        Ok(rows.into_iter().map(AccessLogEntry::from).collect())
    }
}
