//! Shared test harness: in-memory SQLite with migrations applied, a fresh
//! in-memory cache, and a wired `SecretService`.

#![allow(dead_code)]

use secureshare::cache::{CacheStore, MemoryCacheStore};
use secureshare::config::{CacheConfig, DatabaseConfig, RateLimitConfig};
use secureshare::domain::{SecretKind, UserId};
use secureshare::ratelimit::RateLimiter;
use secureshare::services::{AccessContext, CreateSecretRequest, SecretService};
use secureshare::storage::{
    create_pool, run_migrations, DbPool, NewUser, SqlxUserRepository, UserRepository,
};
use std::sync::Arc;

pub struct TestApp {
    pub pool: DbPool,
    pub cache: Arc<MemoryCacheStore>,
    pub service: SecretService,
    pub owner: UserId,
}

pub async fn setup() -> TestApp {
    setup_with(RateLimitConfig::default(), CacheConfig::default()).await
}

pub async fn setup_with(rate_limit: RateLimitConfig, cache_cfg: CacheConfig) -> TestApp {
    let db_config = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        min_connections: 1,
        idle_timeout_seconds: 0,
        ..Default::default()
    };

    let pool = create_pool(&db_config).await.expect("failed to create pool");
    run_migrations(&pool).await.expect("failed to run migrations");

    let owner = seed_user(&pool, "owner@example.com").await;

    let cache = Arc::new(MemoryCacheStore::new());
    let limiter = RateLimiter::new(cache.clone() as Arc<dyn CacheStore>, rate_limit);
    let service = SecretService::with_sqlx(
        pool.clone(),
        cache.clone() as Arc<dyn CacheStore>,
        limiter,
        cache_cfg,
    );

    TestApp { pool, cache, service, owner }
}

pub async fn seed_user(pool: &DbPool, email: &str) -> UserId {
    let users = SqlxUserRepository::new(pool.clone());
    users
        .insert(NewUser { id: UserId::new(), email: email.to_string(), display_name: None })
        .await
        .expect("failed to seed user")
        .id
}

pub fn create_request(title: &str) -> CreateSecretRequest {
    CreateSecretRequest {
        title: title.to_string(),
        description: None,
        content: "the payload".to_string(),
        kind: SecretKind::Text,
        file_name: None,
        password: None,
        expires_at: None,
        delete_after_view: false,
        max_views: None,
        is_public: false,
    }
}

pub fn access_from(ip: &str) -> AccessContext {
    AccessContext {
        ip_address: ip.to_string(),
        user_agent: "integration-test".to_string(),
        user_id: None,
        password: None,
    }
}

pub fn access_with_password(ip: &str, password: &str) -> AccessContext {
    AccessContext { password: Some(password.to_string()), ..access_from(ip) }
}
