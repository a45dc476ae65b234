//! # Configuration Settings
//!
//! Defines the configuration structure for the SecureShare core.

use crate::errors::{Result, SecureShareError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct AppConfig {
    /// Database configuration
    #[validate(nested)]
    pub database: DatabaseConfig,

    /// Cache TTL configuration
    #[validate(nested)]
    pub cache: CacheConfig,

    /// Rate limit policy overrides
    #[validate(nested)]
    pub rate_limit: RateLimitConfig,

    /// Observability configuration
    #[validate(nested)]
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Load configuration from the environment.
    ///
    /// Defaults are overridden by `SECURESHARE_`-prefixed variables, with `__`
    /// separating sections (e.g. `SECURESHARE_DATABASE__URL`,
    /// `SECURESHARE_CACHE__METADATA_TTL_SECONDS`).
    pub fn from_env() -> Result<Self> {
        let defaults = config::Config::try_from(&AppConfig::default())?;
        let settings: AppConfig = config::Config::builder()
            .add_source(defaults)
            .add_source(
                config::Environment::with_prefix("SECURESHARE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        settings.validate_all()?;
        Ok(settings)
    }

    /// Validate the entire configuration
    pub fn validate_all(&self) -> Result<()> {
        // Use validator crate for basic validation
        Validate::validate(self).map_err(SecureShareError::from)?;

        // Custom validation logic
        self.validate_custom()?;

        Ok(())
    }

    /// Custom validation logic that goes beyond what the validator crate can do
    fn validate_custom(&self) -> Result<()> {
        // Content is more sensitive than metadata and must not outlive it in cache
        if self.cache.content_ttl_seconds > self.cache.metadata_ttl_seconds {
            return Err(SecureShareError::validation(
                "Content cache TTL must not exceed metadata cache TTL",
            ));
        }

        if !self.database.url.starts_with("sqlite:") {
            return Err(SecureShareError::validation("Database URL must start with 'sqlite:'"));
        }

        Ok(())
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DatabaseConfig {
    /// Database connection URL
    #[validate(length(min = 1, message = "Database URL cannot be empty"))]
    pub url: String,

    /// Maximum number of connections in the pool
    #[validate(range(min = 1, max = 100, message = "Max connections must be between 1 and 100"))]
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    #[validate(range(max = 50, message = "Min connections must be at most 50"))]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[validate(range(
        min = 1,
        max = 60,
        message = "Connect timeout must be between 1 and 60 seconds"
    ))]
    pub connect_timeout_seconds: u64,

    /// Idle timeout in seconds (0 = no timeout)
    pub idle_timeout_seconds: u64,

    /// Enable automatic migrations
    pub auto_migrate: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://./data/secureshare.db".to_string(),
            max_connections: 10,
            min_connections: 0,
            connect_timeout_seconds: 10,
            idle_timeout_seconds: 600,
            auto_migrate: true,
        }
    }
}

impl DatabaseConfig {
    /// Get connection timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    /// Get idle timeout as Duration (None if 0)
    pub fn idle_timeout(&self) -> Option<Duration> {
        if self.idle_timeout_seconds == 0 {
            None
        } else {
            Some(Duration::from_secs(self.idle_timeout_seconds))
        }
    }
}

/// Cache TTL configuration.
///
/// Content carries the sensitive payload, so it gets a shorter TTL than the
/// metadata projection.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CacheConfig {
    /// TTL for cached secret metadata, in seconds
    #[validate(range(min = 1, max = 86400, message = "Metadata TTL must be 1..=86400 seconds"))]
    pub metadata_ttl_seconds: u64,

    /// TTL for cached secret content, in seconds
    #[validate(range(min = 1, max = 86400, message = "Content TTL must be 1..=86400 seconds"))]
    pub content_ttl_seconds: u64,

    /// TTL for cached per-user secret listings, in seconds
    #[validate(range(min = 1, max = 86400, message = "Listing TTL must be 1..=86400 seconds"))]
    pub listing_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { metadata_ttl_seconds: 300, content_ttl_seconds: 60, listing_ttl_seconds: 120 }
    }
}

impl CacheConfig {
    pub fn metadata_ttl(&self) -> Duration {
        Duration::from_secs(self.metadata_ttl_seconds)
    }

    pub fn content_ttl(&self) -> Duration {
        Duration::from_secs(self.content_ttl_seconds)
    }

    pub fn listing_ttl(&self) -> Duration {
        Duration::from_secs(self.listing_ttl_seconds)
    }
}

/// A single rate limit policy: `limit` operations per fixed window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct PolicyConfig {
    /// Maximum operations per window
    #[validate(range(min = 1, message = "Limit must be at least 1"))]
    pub limit: u32,

    /// Window length in seconds
    #[validate(range(min = 1, message = "Window must be at least 1 second"))]
    pub window_seconds: u64,
}

impl PolicyConfig {
    pub const fn new(limit: u32, window_seconds: u64) -> Self {
        Self { limit, window_seconds }
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }
}

/// Named rate limit policies, one per sensitive operation
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RateLimitConfig {
    #[validate(nested)]
    pub login: PolicyConfig,
    #[validate(nested)]
    pub register: PolicyConfig,
    #[validate(nested)]
    pub email_verification: PolicyConfig,
    #[validate(nested)]
    pub create_secret: PolicyConfig,
    #[validate(nested)]
    pub view_secret: PolicyConfig,
    #[validate(nested)]
    pub share_secret: PolicyConfig,
    #[validate(nested)]
    pub api_general: PolicyConfig,
    #[validate(nested)]
    pub api_strict: PolicyConfig,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            login: PolicyConfig::new(5, 300),
            register: PolicyConfig::new(3, 3600),
            email_verification: PolicyConfig::new(5, 3600),
            create_secret: PolicyConfig::new(20, 3600),
            view_secret: PolicyConfig::new(60, 60),
            share_secret: PolicyConfig::new(30, 3600),
            api_general: PolicyConfig::new(100, 60),
            api_strict: PolicyConfig::new(20, 60),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ObservabilityConfig {
    /// Tracing service name
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service_name: String,

    /// Log level (trace, debug, info, warn, error)
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logging: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: "secureshare".to_string(),
            log_level: "info".to_string(),
            json_logging: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate_all().is_ok());
    }

    #[test]
    fn test_content_ttl_must_not_exceed_metadata_ttl() {
        let mut config = AppConfig::default();
        config.cache.metadata_ttl_seconds = 30;
        config.cache.content_ttl_seconds = 60;

        let result = config.validate_all();
        assert!(result.is_err());
    }

    #[test]
    fn test_non_sqlite_url_rejected() {
        let mut config = AppConfig::default();
        config.database.url = "postgresql://localhost/secureshare".to_string();
        assert!(config.validate_all().is_err());
    }

    #[test]
    fn test_zero_limit_rejected() {
        let mut config = AppConfig::default();
        config.rate_limit.view_secret = PolicyConfig::new(0, 60);
        assert!(config.validate_all().is_err());
    }

    #[test]
    fn test_config_from_env_overrides() {
        std::env::set_var("SECURESHARE_CACHE__CONTENT_TTL_SECONDS", "15");

        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.cache.content_ttl_seconds, 15);
        // Untouched sections keep their defaults
        assert_eq!(config.cache.metadata_ttl_seconds, 300);

        std::env::remove_var("SECURESHARE_CACHE__CONTENT_TTL_SECONDS");
    }

    #[test]
    fn test_database_timeout_helpers() {
        let mut config = DatabaseConfig::default();
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.idle_timeout(), Some(Duration::from_secs(600)));

        config.idle_timeout_seconds = 0;
        assert_eq!(config.idle_timeout(), None);
    }
}
