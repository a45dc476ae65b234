//! Sharing records repository.

use crate::domain::{SecretId, ShareId, UserId};
use crate::errors::{Result, SecureShareError};
use crate::storage::DbPool;
use async_trait::async_trait;
use sqlx::FromRow;
use tracing::instrument;

#[derive(Debug, Clone, FromRow)]
struct SharedSecretRow {
    pub id: String,
    pub secret_id: String,
    pub shared_by: String,
    pub shared_with_email: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// A secret shared with a recipient by email
#[derive(Debug, Clone, PartialEq)]
pub struct SharedSecret {
    pub id: ShareId,
    pub secret_id: SecretId,
    pub shared_by: UserId,
    pub shared_with_email: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<SharedSecretRow> for SharedSecret {
    fn from(row: SharedSecretRow) -> Self {
        Self {
            id: ShareId::from_string(row.id),
            secret_id: SecretId::from_string(row.secret_id),
            shared_by: UserId::from_string(row.shared_by),
            shared_with_email: row.shared_with_email,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewSharedSecret {
    pub secret_id: SecretId,
    pub shared_by: UserId,
    pub shared_with_email: String,
}

#[async_trait]
pub trait ShareRepository: Send + Sync {
    async fn insert(&self, new: NewSharedSecret) -> Result<SharedSecret>;
    async fn list_for_secret(&self, secret_id: &SecretId) -> Result<Vec<SharedSecret>>;
}

#[derive(Debug, Clone)]
pub struct SqlxShareRepository {
    pool: DbPool,
}

impl SqlxShareRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ShareRepository for SqlxShareRepository {
    #[instrument(skip(self, new), fields(secret_id = %new.secret_id), name = "db_insert_share")]
    async fn insert(&self, new: NewSharedSecret) -> Result<SharedSecret> {
        let id = ShareId::new();
        let now = chrono::Utc::now();

        sqlx::query(
            "INSERT INTO shared_secrets (id, secret_id, shared_by, shared_with_email, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&new.secret_id)
        .bind(&new.shared_by)
        .bind(&new.shared_with_email)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if e.as_database_error().is_some_and(|db| db.is_unique_violation()) {
                SecureShareError::validation("Secret already shared with this recipient")
            } else {
                SecureShareError::Database {
                    source: e,
                    context: format!("Failed to share secret '{}'", new.secret_id),
                }
            }
        })?;

        tracing::info!(secret_id = %new.secret_id, "Recorded secret share");

        Ok(SharedSecret {
            id,
            secret_id: new.secret_id,
            shared_by: new.shared_by,
            shared_with_email: new.shared_with_email,
            created_at: now,
        })
    }

    #[instrument(skip(self), fields(secret_id = %secret_id), name = "db_list_shares")]
    async fn list_for_secret(&self, secret_id: &SecretId) -> Result<Vec<SharedSecret>> {
        let rows = sqlx::query_as::<_, SharedSecretRow>(
            "SELECT id, secret_id, shared_by, shared_with_email, created_at \
             FROM shared_secrets WHERE secret_id = ? ORDER BY created_at DESC",
        )
        .bind(secret_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| SecureShareError::Database {
            source: e,
            context: format!("Failed to list shares for secret '{}'", secret_id),
        })?;

        Ok(rows.into_iter().map(SharedSecret::from).collect())
    }
}
