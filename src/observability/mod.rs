//! # Observability Infrastructure
//!
//! Structured logging setup for the SecureShare core. Components emit
//! `tracing` spans and events; the embedding process calls [`init_tracing`]
//! once at startup.

use crate::config::ObservabilityConfig;
use crate::errors::{Result, SecureShareError};
use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber from configuration.
///
/// `RUST_LOG` takes precedence over the configured log level. Returns an
/// error if a global subscriber is already installed.
pub fn init_tracing(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    let result = if config.json_logging {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|err| {
        SecureShareError::internal(format!("Failed to initialize tracing subscriber: {}", err))
    })?;

    tracing::info!(
        service_name = %config.service_name,
        log_level = %config.log_level,
        json_logging = config.json_logging,
        "Observability initialized"
    );

    Ok(())
}
