//! Audit log repository for analytics and lifecycle events.
//!
//! Records secret lifecycle actions (`create`, `view`, `update`, `delete`,
//! `share`) with structured metadata.

use crate::domain::{SecretId, UserId};
use crate::errors::{Result, SecureShareError};
use crate::storage::DbPool;
use sqlx::FromRow;

/// Audit event descriptor.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub action: String,
    pub resource_id: Option<String>,
    pub user_id: Option<String>,
    pub metadata: serde_json::Value,
}

impl AuditEvent {
    pub fn secret(
        action: &str,
        secret_id: &SecretId,
        user_id: Option<&UserId>,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            action: action.to_string(),
            resource_id: Some(secret_id.as_str().to_string()),
            user_id: user_id.map(|value| value.as_str().to_string()),
            metadata,
        }
    }
}

/// One persisted audit record
#[derive(Debug, Clone, FromRow)]
pub struct AuditLogEntry {
    pub id: i64,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub action: String,
    pub metadata: String,
    pub user_id: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Repository for audit log interactions.
#[derive(Debug, Clone)]
pub struct AuditLogRepository {
    pool: DbPool,
}

impl AuditLogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn record_event(&self, resource_type: &str, event: AuditEvent) -> Result<()> {
        let now = chrono::Utc::now();
        let metadata_json = serde_json::to_string(&event.metadata).map_err(|err| {
            SecureShareError::validation(format!("Invalid audit metadata JSON: {}", err))
        })?;

        sqlx::query(
            "INSERT INTO audit_log (resource_type, resource_id, action, metadata, user_id, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(resource_type)
        .bind(event.resource_id.as_deref())
        .bind(event.action.as_str())
        .bind(metadata_json)
        .bind(event.user_id.as_deref())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|err| SecureShareError::Database {
            source: err,
            context: "Failed to write audit event".to_string(),
        })?;

        Ok(())
    }

    /// Record a secret lifecycle event.
    pub async fn record_secret_event(&self, event: AuditEvent) -> Result<()> {
        self.record_event("secret", event).await
    }

    /// Most recent audit entries for a resource, newest first.
    pub async fn list_for_resource(
        &self,
        resource_type: &str,
        resource_id: &str,
        limit: i64,
    ) -> Result<Vec<AuditLogEntry>> {
        let rows = sqlx::query_as::<_, AuditLogEntry>(
            "SELECT id, resource_type, resource_id, action, metadata, user_id, created_at \
             FROM audit_log WHERE resource_type = ? AND resource_id = ? \
             ORDER BY id DESC LIMIT ?",
        )
        .bind(resource_type)
        .bind(resource_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|err| SecureShareError::Database {
            source: err,
            context: "Failed to list audit events".to_string(),
        })?;

        Ok(rows)
    }
}
