//! # Error Types
//!
//! Error types for the SecureShare core using `thiserror`.

use std::fmt;

/// Custom result type for SecureShare operations
pub type Result<T> = std::result::Result<T, SecureShareError>;

/// Main error type for the SecureShare core
#[derive(thiserror::Error, Debug)]
pub enum SecureShareError {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Database and storage errors
    #[error("Database error: {context}")]
    Database {
        #[source]
        source: sqlx::Error,
        context: String,
    },

    /// Cache backend errors. Read paths swallow these and fall back to the
    /// store; the rate limiter fails open on them.
    #[error("Cache error: {message}")]
    Cache { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {context}")]
    Serialization {
        #[source]
        source: serde_json::Error,
        context: String,
    },

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// Resource not found errors
    #[error("Resource not found: {resource_type} with ID '{id}'")]
    NotFound { resource_type: String, id: String },

    /// Ownership check failed on a mutating operation. Also returned when the
    /// target row does not exist, so callers cannot distinguish "not found"
    /// from "not yours".
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// Access to a secret was denied by the access-control evaluator
    #[error("Access denied: {reason}")]
    AccessDenied { reason: DenialReason },

    /// Rate limiting errors
    #[error("Rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited {
        retry_after_secs: u64,
        reset_at_ms: i64,
    },

    /// Internal errors
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Denial reasons produced by the access-control evaluator.
///
/// Each reason stays distinguishable end to end so the presentation layer can
/// show the right message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    /// `expires_at` is set and lies in the past
    Expired,
    /// `max_views` is set and `current_views` has reached it
    ViewLimitReached,
    /// The secret has been soft-deleted or consumed
    Inactive,
    /// A password is required and the supplied one does not match
    InvalidPassword,
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenialReason::Expired => write!(f, "expired"),
            DenialReason::ViewLimitReached => write!(f, "view_limit_reached"),
            DenialReason::Inactive => write!(f, "inactive"),
            DenialReason::InvalidPassword => write!(f, "invalid_password"),
        }
    }
}

impl SecureShareError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into(), source: None }
    }

    /// Create a configuration error with source
    pub fn config_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Config { message: message.into(), source: Some(source) }
    }

    /// Create a cache error
    pub fn cache<S: Into<String>>(message: S) -> Self {
        Self::Cache { message: message.into() }
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into(), field: None }
    }

    /// Create a validation error with field information
    pub fn validation_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Validation { message: message.into(), field: Some(field.into()) }
    }

    /// Create a not found error
    pub fn not_found<R: Into<String>, I: Into<String>>(resource_type: R, id: I) -> Self {
        Self::NotFound { resource_type: resource_type.into(), id: id.into() }
    }

    /// Create an unauthorized error
    pub fn unauthorized<S: Into<String>>(message: S) -> Self {
        Self::Unauthorized { message: message.into() }
    }

    /// Create an access denied error
    pub fn access_denied(reason: DenialReason) -> Self {
        Self::AccessDenied { reason }
    }

    /// Create a rate limit error
    pub fn rate_limited(retry_after_secs: u64, reset_at_ms: i64) -> Self {
        Self::RateLimited { retry_after_secs, reset_at_ms }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into(), source: None }
    }

    /// Get the HTTP status code that should be returned for this error
    pub fn status_code(&self) -> u16 {
        match self {
            SecureShareError::Config { .. } => 500,
            SecureShareError::Database { .. } => 500,
            SecureShareError::Cache { .. } => 503,
            SecureShareError::Serialization { .. } => 400,
            SecureShareError::Validation { .. } => 400,
            SecureShareError::NotFound { .. } => 404,
            // Presented as 404 so existence is not leaked to non-owners.
            SecureShareError::Unauthorized { .. } => 404,
            SecureShareError::AccessDenied { reason } => match reason {
                DenialReason::InvalidPassword => 401,
                _ => 410,
            },
            SecureShareError::RateLimited { .. } => 429,
            SecureShareError::Internal { .. } => 500,
        }
    }

    /// Check if this error should be retried
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SecureShareError::Database { .. }
                | SecureShareError::Cache { .. }
                | SecureShareError::RateLimited { .. }
        )
    }

    /// The denial reason, if this is an access-denied error
    pub fn denial_reason(&self) -> Option<DenialReason> {
        match self {
            SecureShareError::AccessDenied { reason } => Some(*reason),
            _ => None,
        }
    }
}

// Error conversions for common external error types
impl From<sqlx::Error> for SecureShareError {
    fn from(error: sqlx::Error) -> Self {
        Self::Database { source: error, context: "Database operation failed".to_string() }
    }
}

impl From<serde_json::Error> for SecureShareError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization { source: error, context: "JSON serialization failed".to_string() }
    }
}

impl From<config::ConfigError> for SecureShareError {
    fn from(error: config::ConfigError) -> Self {
        Self::config_with_source("Configuration loading failed", Box::new(error))
    }
}

impl From<validator::ValidationErrors> for SecureShareError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .iter()
            .map(|(field, field_errors)| {
                let error_messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| {
                        e.message.as_ref().map_or("Invalid value".to_string(), |m| m.to_string())
                    })
                    .collect();
                format!("{}: {}", field, error_messages.join(", "))
            })
            .collect::<Vec<_>>()
            .join("; ");

        Self::validation(format!("Validation failed: {}", message))
    }
}
