//! Secret access-control evaluation.
//!
//! Decides, for a single read attempt, whether the requester may see a
//! secret's content and which mutations must follow. Checks run in a fixed
//! order with the first failure winning: expiration, then view limit, then
//! the active flag, then the password. The cheap, decisive checks come before
//! the password comparison so password validity is never revealed for a
//! secret that is already expired or exhausted.
//!
//! A denial is final for the attempt; a retry with corrected input re-runs
//! the full evaluation.

use crate::auth::hashing;
use crate::domain::Secret;
use crate::errors::{DenialReason, Result, SecureShareError};
use argon2::Argon2;
use std::sync::Arc;

/// Mutations that must follow a granted access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessGrant {
    /// The view increment is always persisted; deactivation additionally
    /// applies to one-time-view secrets
    pub deactivate: bool,
}

/// Evaluates access attempts against a secret record
#[derive(Clone)]
pub struct AccessEvaluator {
    argon2: Arc<Argon2<'static>>,
}

impl AccessEvaluator {
    pub fn new(argon2: Arc<Argon2<'static>>) -> Self {
        Self { argon2 }
    }

    /// Run the ordered checks for one access attempt.
    ///
    /// Returns the grant with its follow-up mutations, or an
    /// [`SecureShareError::AccessDenied`] carrying the specific reason. No
    /// mutation happens here; the caller persists the side effects.
    pub fn evaluate(
        &self,
        secret: &Secret,
        now: chrono::DateTime<chrono::Utc>,
        supplied_password: Option<&str>,
    ) -> Result<AccessGrant> {
        if let Some(expires_at) = secret.expires_at {
            if now > expires_at {
                return Err(SecureShareError::access_denied(DenialReason::Expired));
            }
        }

        if let Some(max_views) = secret.max_views {
            if secret.current_views >= max_views {
                return Err(SecureShareError::access_denied(DenialReason::ViewLimitReached));
            }
        }

        if !secret.is_active {
            return Err(SecureShareError::access_denied(DenialReason::Inactive));
        }

        if let Some(stored_hash) = &secret.password_hash {
            let supplied = supplied_password.ok_or_else(|| {
                SecureShareError::access_denied(DenialReason::InvalidPassword)
            })?;
            if !hashing::verify_password(&self.argon2, stored_hash, supplied)? {
                return Err(SecureShareError::access_denied(DenialReason::InvalidPassword));
            }
        }

        Ok(AccessGrant { deactivate: secret.delete_after_view })
    }
}

impl std::fmt::Debug for AccessEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessEvaluator").finish()
    }
}
