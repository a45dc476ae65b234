//! # SecureShare Core
//!
//! Core logic for sharing sensitive text snippets with password protection,
//! expiration, and view-count limits.
//!
//! ## Architecture
//!
//! The system follows a layered pattern with the persistent store as the
//! single source of truth and the key-value cache as a performance layer:
//!
//! ```text
//! RPC handler (out of scope)
//!     → rate limiter gate
//!     → cache-aside secret service
//!     → access-control evaluator
//!     → persistent store mutation + cache refresh
//! ```
//!
//! ## Core Components
//!
//! - **[`services::SecretService`]**: cache-aside lifecycle operations
//!   (create, read, access, update, soft delete, list, share)
//! - **[`access::AccessEvaluator`]**: ordered expiry/view-limit/active/password
//!   checks for a single access attempt
//! - **[`ratelimit::RateLimiter`]**: fixed-window counters over the cache,
//!   failing open when the counter store is unreachable
//! - **[`storage`]**: SQLx/SQLite repositories for secrets, users, access
//!   logs, sharing records, and audit events
//!
//! Clients, pools, and the cache are constructed by the embedding process and
//! injected; components never own connection lifecycles.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use secureshare::cache::MemoryCacheStore;
//! use secureshare::config::AppConfig;
//! use secureshare::ratelimit::RateLimiter;
//! use secureshare::services::SecretService;
//! use secureshare::storage;
//! use std::sync::Arc;
//!
//! # async fn run() -> secureshare::Result<()> {
//! let config = AppConfig::from_env()?;
//! let pool = storage::create_pool(&config.database).await?;
//! storage::run_migrations(&pool).await?;
//!
//! let cache = Arc::new(MemoryCacheStore::new());
//! let limiter = RateLimiter::new(cache.clone(), config.rate_limit.clone());
//! let service = SecretService::with_sqlx(pool, cache, limiter, config.cache.clone());
//! # let _ = service;
//! # Ok(())
//! # }
//! ```

pub mod access;
pub mod auth;
pub mod cache;
pub mod config;
pub mod domain;
pub mod errors;
pub mod observability;
pub mod ratelimit;
pub mod services;
pub mod storage;

// Re-export commonly used types and traits
pub use config::AppConfig;
pub use errors::{DenialReason, Result, SecureShareError};
pub use observability::init_tracing;

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_available() {
        assert!(!VERSION.is_empty());
        assert_eq!(APP_NAME, "secureshare");
    }
}
