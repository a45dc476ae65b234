//! # Configuration Management
//!
//! Layered configuration for the SecureShare core: serde defaults overridden
//! by `SECURESHARE_`-prefixed environment variables, validated before use.

pub mod settings;

pub use settings::{
    AppConfig, CacheConfig, DatabaseConfig, ObservabilityConfig, PolicyConfig, RateLimitConfig,
};
