//! Cache key namespacing.
//!
//! These prefixes are shared with other consumers of the same backing store
//! (session handling, email verification, password reset) and must stay
//! stable for interoperability. Secret metadata and content live under
//! distinct sub-keys so they can be evicted independently and carry
//! independent TTLs.

use crate::domain::{SecretId, UserId};

pub const USER_PREFIX: &str = "user:";
pub const SESSION_PREFIX: &str = "session:";
pub const SECRET_PREFIX: &str = "secret:";
pub const RATE_LIMIT_PREFIX: &str = "rate_limit:";
pub const EMAIL_VERIFICATION_PREFIX: &str = "email_verification:";
pub const PASSWORD_RESET_PREFIX: &str = "password_reset:";
pub const ACCESS_LOG_PREFIX: &str = "access_log:";

/// Key for a secret's cached metadata projection
pub fn secret_metadata(id: &SecretId) -> String {
    format!("{}meta:{}", SECRET_PREFIX, id)
}

/// Key for a secret's cached raw content
pub fn secret_content(id: &SecretId) -> String {
    format!("{}content:{}", SECRET_PREFIX, id)
}

/// Key for a user's cached secret listing
pub fn user_secrets(user_id: &UserId) -> String {
    format!("{}user:{}", SECRET_PREFIX, user_id)
}

/// Key for a rate limit counter, composed of limit kind and identifier
pub fn rate_limit(kind: &str, identifier: &str) -> String {
    format!("{}{}:{}", RATE_LIMIT_PREFIX, kind, identifier)
}
