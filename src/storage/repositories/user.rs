//! User repository.
//!
//! Minimal owner records. Registration, sessions, and the rest of the
//! authentication surface live outside the core; secrets and access logs
//! only need a user to reference.

use crate::domain::UserId;
use crate::errors::{Result, SecureShareError};
use crate::storage::DbPool;
use async_trait::async_trait;
use sqlx::FromRow;
use tracing::instrument;

#[derive(Debug, Clone, FromRow)]
struct UserRow {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub display_name: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: UserId::from_string(row.id),
            email: row.email,
            display_name: row.display_name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: UserId,
    pub email: String,
    pub display_name: Option<String>,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn insert(&self, new: NewUser) -> Result<User>;
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
}

#[derive(Debug, Clone)]
pub struct SqlxUserRepository {
    pool: DbPool,
}

impl SqlxUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    #[instrument(skip(self, new), fields(user_id = %new.id), name = "db_insert_user")]
    async fn insert(&self, new: NewUser) -> Result<User> {
        let now = chrono::Utc::now();

        sqlx::query(
            "INSERT INTO users (id, email, display_name, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&new.id)
        .bind(&new.email)
        .bind(&new.display_name)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if e.as_database_error().is_some_and(|db| db.is_unique_violation()) {
                SecureShareError::validation_field("Email already registered", "email")
            } else {
                SecureShareError::Database {
                    source: e,
                    context: format!("Failed to insert user '{}'", new.id),
                }
            }
        })?;

        self.find_by_id(&new.id).await?.ok_or_else(|| {
            SecureShareError::internal(format!("User '{}' vanished after insert", new.id))
        })
    }

    #[instrument(skip(self), fields(user_id = %id), name = "db_find_user")]
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, display_name, created_at, updated_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| SecureShareError::Database {
            source: e,
            context: format!("Failed to fetch user '{}'", id),
        })?;

        Ok(row.map(User::from))
    }

    #[instrument(skip(self), name = "db_find_user_by_email")]
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, display_name, created_at, updated_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| SecureShareError::Database {
            source: e,
            context: "Failed to fetch user by email".to_string(),
        })?;

        Ok(row.map(User::from))
    }
}
