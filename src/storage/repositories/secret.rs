//! Secret repository.
//!
//! CRUD plus the two access-path mutations: the atomic view-count increment
//! and the terminal deactivation. Secrets are never physically deleted by
//! normal flows.

use crate::domain::{Secret, SecretId, SecretKind, UserId};
use crate::errors::{Result, SecureShareError};
use crate::storage::DbPool;
use async_trait::async_trait;
use sqlx::FromRow;
use tracing::instrument;

/// Database row structure for secrets
#[derive(Debug, Clone, FromRow)]
struct SecretRow {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub content: String,
    pub kind: String,
    pub file_name: Option<String>,
    pub password_hash: Option<String>,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
    pub delete_after_view: bool,
    pub max_views: Option<i64>,
    pub current_views: i64,
    pub is_active: bool,
    pub is_public: bool,
    pub created_by: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl SecretRow {
    fn into_model(self) -> Result<Secret> {
        let kind = self.kind.parse::<SecretKind>().map_err(SecureShareError::internal)?;

        Ok(Secret {
            id: SecretId::from_string(self.id),
            title: self.title,
            description: self.description,
            content: self.content,
            kind,
            file_name: self.file_name,
            password_hash: self.password_hash,
            expires_at: self.expires_at,
            delete_after_view: self.delete_after_view,
            max_views: self.max_views,
            current_views: self.current_views,
            is_active: self.is_active,
            is_public: self.is_public,
            created_by: UserId::from_string(self.created_by),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const SECRET_COLUMNS: &str = "id, title, description, content, kind, file_name, password_hash, \
     expires_at, delete_after_view, max_views, current_views, is_active, is_public, created_by, \
     created_at, updated_at";

/// New secret to persist. View count starts at zero and the record starts
/// active; neither is caller-controlled.
#[derive(Debug, Clone)]
pub struct NewSecret {
    pub id: SecretId,
    pub title: String,
    pub description: Option<String>,
    pub content: String,
    pub kind: SecretKind,
    pub file_name: Option<String>,
    pub password_hash: Option<String>,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
    pub delete_after_view: bool,
    pub max_views: Option<i64>,
    pub is_public: bool,
    pub created_by: UserId,
}

/// Field-level update. Outer `None` leaves a field untouched; for nullable
/// columns the inner `Option` distinguishes "set" from "clear".
#[derive(Debug, Clone, Default)]
pub struct SecretUpdate {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub content: Option<String>,
    pub file_name: Option<Option<String>>,
    pub password_hash: Option<Option<String>>,
    pub expires_at: Option<Option<chrono::DateTime<chrono::Utc>>>,
    pub delete_after_view: Option<bool>,
    pub max_views: Option<Option<i64>>,
    pub is_public: Option<bool>,
}

#[async_trait]
pub trait SecretRepository: Send + Sync {
    async fn insert(&self, new: NewSecret) -> Result<Secret>;
    /// Returns `None` on absence rather than an error
    async fn find_by_id(&self, id: &SecretId) -> Result<Option<Secret>>;
    /// Errors with `NotFound` when the row is missing
    async fn update(&self, id: &SecretId, update: SecretUpdate) -> Result<Secret>;
    /// Atomic store-level increment; returns the new view count
    async fn increment_views(&self, id: &SecretId) -> Result<i64>;
    /// Terminal soft delete
    async fn deactivate(&self, id: &SecretId) -> Result<()>;
    async fn list_active_by_owner(&self, owner: &UserId) -> Result<Vec<Secret>>;
}

/// sqlx-backed [`SecretRepository`]
#[derive(Debug, Clone)]
pub struct SqlxSecretRepository {
    pool: DbPool,
}

impl SqlxSecretRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SecretRepository for SqlxSecretRepository {
    #[instrument(skip(self, new), fields(secret_id = %new.id), name = "db_insert_secret")]
    async fn insert(&self, new: NewSecret) -> Result<Secret> {
        let now = chrono::Utc::now();

        sqlx::query(
            "INSERT INTO secrets (id, title, description, content, kind, file_name, password_hash, \
             expires_at, delete_after_view, max_views, current_views, is_active, is_public, \
             created_by, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, 1, ?, ?, ?, ?)",
        )
        .bind(&new.id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(&new.content)
        .bind(new.kind.as_str())
        .bind(&new.file_name)
        .bind(&new.password_hash)
        .bind(new.expires_at)
        .bind(new.delete_after_view)
        .bind(new.max_views)
        .bind(new.is_public)
        .bind(&new.created_by)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, secret_id = %new.id, "Failed to insert secret");
            SecureShareError::Database {
                source: e,
                context: format!("Failed to insert secret '{}'", new.id),
            }
        })?;

        tracing::info!(secret_id = %new.id, owner = %new.created_by, "Created new secret");

        self.find_by_id(&new.id).await?.ok_or_else(|| {
            SecureShareError::internal(format!("Secret '{}' vanished after insert", new.id))
        })
    }

    #[instrument(skip(self), fields(secret_id = %id), name = "db_find_secret")]
    async fn find_by_id(&self, id: &SecretId) -> Result<Option<Secret>> {
        let sql = format!("SELECT {} FROM secrets WHERE id = ?", SECRET_COLUMNS);
        let row = sqlx::query_as::<_, SecretRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, secret_id = %id, "Failed to fetch secret");
                SecureShareError::Database {
                    source: e,
                    context: format!("Failed to fetch secret '{}'", id),
                }
            })?;

        row.map(SecretRow::into_model).transpose()
    }

    #[instrument(skip(self, update), fields(secret_id = %id), name = "db_update_secret")]
    async fn update(&self, id: &SecretId, update: SecretUpdate) -> Result<Secret> {
        let current = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| SecureShareError::not_found("secret", id.as_str()))?;

        let now = chrono::Utc::now();
        let title = update.title.unwrap_or(current.title);
        let description = update.description.unwrap_or(current.description);
        let content = update.content.unwrap_or(current.content);
        let file_name = update.file_name.unwrap_or(current.file_name);
        let password_hash = update.password_hash.unwrap_or(current.password_hash);
        let expires_at = update.expires_at.unwrap_or(current.expires_at);
        let delete_after_view = update.delete_after_view.unwrap_or(current.delete_after_view);
        let max_views = update.max_views.unwrap_or(current.max_views);
        let is_public = update.is_public.unwrap_or(current.is_public);

        sqlx::query(
            "UPDATE secrets SET title = ?, description = ?, content = ?, file_name = ?, \
             password_hash = ?, expires_at = ?, delete_after_view = ?, max_views = ?, \
             is_public = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&title)
        .bind(&description)
        .bind(&content)
        .bind(&file_name)
        .bind(&password_hash)
        .bind(expires_at)
        .bind(delete_after_view)
        .bind(max_views)
        .bind(is_public)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| SecureShareError::Database {
            source: e,
            context: format!("Failed to update secret '{}'", id),
        })?;

        tracing::info!(secret_id = %id, "Updated secret");

        self.find_by_id(id)
            .await?
            .ok_or_else(|| SecureShareError::not_found("secret", id.as_str()))
    }

    #[instrument(skip(self), fields(secret_id = %id), name = "db_increment_views")]
    async fn increment_views(&self, id: &SecretId) -> Result<i64> {
        // Single-statement increment so racing viewers never lose an update
        let count: Option<i64> = sqlx::query_scalar(
            "UPDATE secrets SET current_views = current_views + 1, updated_at = ? \
             WHERE id = ? RETURNING current_views",
        )
        .bind(chrono::Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, secret_id = %id, "Failed to increment view count");
            SecureShareError::Database {
                source: e,
                context: format!("Failed to increment views for secret '{}'", id),
            }
        })?;

        count.ok_or_else(|| SecureShareError::not_found("secret", id.as_str()))
    }

    #[instrument(skip(self), fields(secret_id = %id), name = "db_deactivate_secret")]
    async fn deactivate(&self, id: &SecretId) -> Result<()> {
        let result =
            sqlx::query("UPDATE secrets SET is_active = 0, updated_at = ? WHERE id = ?")
                .bind(chrono::Utc::now())
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(|e| SecureShareError::Database {
                    source: e,
                    context: format!("Failed to deactivate secret '{}'", id),
                })?;

        if result.rows_affected() == 0 {
            return Err(SecureShareError::not_found("secret", id.as_str()));
        }

        tracing::info!(secret_id = %id, "Deactivated secret");
        Ok(())
    }

    #[instrument(skip(self), fields(owner = %owner), name = "db_list_secrets_by_owner")]
    async fn list_active_by_owner(&self, owner: &UserId) -> Result<Vec<Secret>> {
        let sql = format!(
            "SELECT {} FROM secrets WHERE created_by = ? AND is_active = 1 \
             ORDER BY created_at DESC",
            SECRET_COLUMNS
        );
        let rows = sqlx::query_as::<_, SecretRow>(&sql)
            .bind(owner)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| SecureShareError::Database {
                source: e,
                context: format!("Failed to list secrets for user '{}'", owner),
            })?;

        rows.into_iter().map(SecretRow::into_model).collect()
    }
}
