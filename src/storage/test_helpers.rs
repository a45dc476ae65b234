//! Test database utilities for in-library tests.
//!
//! Builds an in-memory SQLite pool with all migrations applied. The pool is
//! capped at a single connection because every `sqlite::memory:` connection
//! opens its own database.

use crate::config::DatabaseConfig;
use crate::domain::UserId;
use crate::storage::repositories::{NewUser, SqlxUserRepository, UserRepository};
use crate::storage::{create_pool, run_migrations, DbPool};

pub(crate) async fn test_pool() -> DbPool {
    let config = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        min_connections: 1,
        idle_timeout_seconds: 0,
        ..Default::default()
    };

    let pool = create_pool(&config).await.expect("failed to create test pool");
    run_migrations(&pool).await.expect("failed to run migrations");
    pool
}

/// Insert a user to satisfy foreign keys on secrets and access logs
pub(crate) async fn seed_user(pool: &DbPool, email: &str) -> UserId {
    let repo = SqlxUserRepository::new(pool.clone());
    let user = repo
        .insert(NewUser {
            id: UserId::new(),
            email: email.to_string(),
            display_name: None,
        })
        .await
        .expect("failed to seed user");
    user.id
}
