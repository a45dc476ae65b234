//! Fixed-window rate limiting backed by the key-value cache.
//!
//! Counters live at `rate_limit:{kind}:{identifier}`. The window is
//! established by the first increment of a fresh counter: that call sets the
//! counter's expiry, and every later increment within the window counts
//! against the same budget. After the window elapses the counter disappears
//! and the next call starts a new one.
//!
//! When the counter store is unreachable the limiter fails open: blocking all
//! traffic on an infrastructure failure would be worse than briefly not
//! limiting it.

use crate::cache::{keys, CacheStore};
use crate::config::{PolicyConfig, RateLimitConfig};
use crate::domain::UserId;
use crate::errors::Result;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Named rate limit policies, one per sensitive operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimitKind {
    Login,
    Register,
    EmailVerification,
    CreateSecret,
    ViewSecret,
    ShareSecret,
    ApiGeneral,
    ApiStrict,
}

impl LimitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LimitKind::Login => "login",
            LimitKind::Register => "register",
            LimitKind::EmailVerification => "email_verification",
            LimitKind::CreateSecret => "create_secret",
            LimitKind::ViewSecret => "view_secret",
            LimitKind::ShareSecret => "share_secret",
            LimitKind::ApiGeneral => "api_general",
            LimitKind::ApiStrict => "api_strict",
        }
    }
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of a rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Operations left in the current window
    pub remaining: u32,
    /// Epoch milliseconds at which the window is reported to reset.
    /// Computed as `now + window` on every call, not from the counter's
    /// actual remaining TTL.
    pub reset_at_ms: i64,
}

impl RateLimitDecision {
    /// Seconds until the reported reset, rounded up
    pub fn retry_after_secs(&self) -> u64 {
        let delta = self.reset_at_ms - chrono::Utc::now().timestamp_millis();
        if delta <= 0 {
            0
        } else {
            (delta as u64).div_ceil(1000)
        }
    }
}

/// Fixed-window rate limiter over a [`CacheStore`]
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn CacheStore>,
    policies: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CacheStore>, policies: RateLimitConfig) -> Self {
        Self { store, policies }
    }

    /// The configured policy for a named limit
    pub fn policy(&self, kind: LimitKind) -> PolicyConfig {
        match kind {
            LimitKind::Login => self.policies.login,
            LimitKind::Register => self.policies.register,
            LimitKind::EmailVerification => self.policies.email_verification,
            LimitKind::CreateSecret => self.policies.create_secret,
            LimitKind::ViewSecret => self.policies.view_secret,
            LimitKind::ShareSecret => self.policies.share_secret,
            LimitKind::ApiGeneral => self.policies.api_general,
            LimitKind::ApiStrict => self.policies.api_strict,
        }
    }

    /// Check the named limit for one identifier (e.g. `ip:203.0.113.9`)
    pub async fn check(&self, kind: LimitKind, identifier: &str) -> RateLimitDecision {
        let key = keys::rate_limit(kind.as_str(), identifier);
        self.check_counter(&key, self.policy(kind)).await
    }

    /// Composite check: IP first, then — only when the IP check passes and a
    /// user identity is present — a user-keyed check at twice the limit.
    /// The first failing decision is returned; the IP gate is never bypassed.
    pub async fn check_with_user(
        &self,
        kind: LimitKind,
        ip: &str,
        user: Option<&UserId>,
    ) -> RateLimitDecision {
        let ip_decision = self.check(kind, &format!("ip:{}", ip)).await;
        if !ip_decision.allowed {
            return ip_decision;
        }

        match user {
            Some(user_id) => {
                let policy = self.policy(kind);
                let lenient =
                    PolicyConfig::new(policy.limit.saturating_mul(2), policy.window_seconds);
                let key =
                    keys::rate_limit(kind.as_str(), &format!("user:{}", user_id));
                self.check_counter(&key, lenient).await
            }
            None => ip_decision,
        }
    }

    /// Burst check: a short-window counter gates a long-window one. A burst
    /// failure is returned as-is; otherwise the sustained decision stands.
    pub async fn check_burst(
        &self,
        identifier: &str,
        burst: PolicyConfig,
        sustained: PolicyConfig,
    ) -> RateLimitDecision {
        let burst_decision =
            self.check_counter(&keys::rate_limit("burst", identifier), burst).await;
        if !burst_decision.allowed {
            return burst_decision;
        }
        self.check_counter(&keys::rate_limit("sustained", identifier), sustained).await
    }

    /// Delete the counter for an identifier (tests/admin tooling)
    pub async fn reset(&self, kind: LimitKind, identifier: &str) -> Result<()> {
        self.store.delete(&keys::rate_limit(kind.as_str(), identifier)).await
    }

    async fn check_counter(&self, key: &str, policy: PolicyConfig) -> RateLimitDecision {
        let reset_at_ms =
            chrono::Utc::now().timestamp_millis() + (policy.window_seconds as i64) * 1000;

        let count = match self.store.increment(key).await {
            Ok(count) => count,
            Err(err) => {
                warn!(key = %key, error = %err, "Counter store unavailable, failing open");
                return RateLimitDecision { allowed: true, remaining: policy.limit, reset_at_ms };
            }
        };

        if count == 1 {
            // First hit of a fresh window establishes its expiry
            if let Err(err) = self.store.expire(key, policy.window()).await {
                warn!(key = %key, error = %err, "Failed to set rate limit window");
            }
        }

        let allowed = count <= policy.limit as i64;
        let remaining = if count >= policy.limit as i64 {
            0
        } else {
            policy.limit - count as u32
        };

        if allowed {
            debug!(key = %key, count = count, remaining = remaining, "Rate limit check passed");
        } else {
            warn!(key = %key, count = count, limit = policy.limit, "Rate limit exceeded");
        }

        RateLimitDecision { allowed, remaining, reset_at_ms }
    }
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter").field("policies", &self.policies).finish()
    }
}
