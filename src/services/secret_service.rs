//! Cache-aside secret service.
//!
//! Composes the persistent store, the key-value cache, the rate limiter, and
//! the access-control evaluator into the secret lifecycle operations. The
//! cache is a performance layer only: writes go store-first, cache failures
//! degrade to store reads, and the store always wins on a miss.
//!
//! The one consistency-critical rule lives on the access path: the
//! `max_views` gate is always evaluated against a fresh store read taken
//! immediately before the atomic increment, never against possibly-stale
//! cached metadata. Two requests racing for the last permitted view may
//! still both be admitted; that at-least-once boundary is accepted behavior.

use crate::access::AccessEvaluator;
use crate::auth::hashing;
use crate::cache::{keys, CacheStore};
use crate::config::CacheConfig;
use crate::domain::{Secret, SecretId, SecretKind, SecretMetadata, UserId};
use crate::errors::{Result, SecureShareError};
use crate::ratelimit::{LimitKind, RateLimitDecision, RateLimiter};
use crate::storage::repositories::{
    AccessLogEntry, AccessLogRepository, AuditEvent, AuditLogRepository, NewAccessLogEntry,
    NewSecret, NewSharedSecret, SecretRepository, SecretUpdate, ShareRepository, SharedSecret,
};
use argon2::Argon2;
use serde_json::json;
use std::sync::Arc;
use tracing::{instrument, warn};
use validator::{Validate, ValidateEmail};

/// Request to create a new secret
#[derive(Debug, Clone, Validate)]
pub struct CreateSecretRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1..=200 characters"))]
    pub title: String,
    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,
    #[validate(length(min = 1, message = "Content cannot be empty"))]
    pub content: String,
    pub kind: SecretKind,
    pub file_name: Option<String>,
    /// Hashed before it is persisted; never stored in plaintext
    pub password: Option<String>,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
    pub delete_after_view: bool,
    #[validate(range(min = 1, message = "Max views must be at least 1"))]
    pub max_views: Option<i64>,
    pub is_public: bool,
}

/// Field-level update request. Outer `None` leaves a field untouched; for
/// nullable fields the inner `Option` distinguishes "set" from "clear".
#[derive(Debug, Clone, Default)]
pub struct UpdateSecretRequest {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub content: Option<String>,
    pub file_name: Option<Option<String>>,
    pub password: Option<Option<String>>,
    pub expires_at: Option<Option<chrono::DateTime<chrono::Utc>>>,
    pub delete_after_view: Option<bool>,
    pub max_views: Option<Option<i64>>,
    pub is_public: Option<bool>,
}

impl UpdateSecretRequest {
    fn validate_fields(&self) -> Result<()> {
        if let Some(title) = &self.title {
            if title.is_empty() || title.len() > 200 {
                return Err(SecureShareError::validation_field(
                    "Title must be 1..=200 characters",
                    "title",
                ));
            }
        }
        if let Some(content) = &self.content {
            if content.is_empty() {
                return Err(SecureShareError::validation_field("Content cannot be empty", "content"));
            }
        }
        if let Some(Some(max_views)) = self.max_views {
            if max_views < 1 {
                return Err(SecureShareError::validation_field(
                    "Max views must be at least 1",
                    "max_views",
                ));
            }
        }
        Ok(())
    }
}

/// Per-request context for an access attempt
#[derive(Debug, Clone)]
pub struct AccessContext {
    pub ip_address: String,
    pub user_agent: String,
    pub user_id: Option<UserId>,
    pub password: Option<String>,
}

/// Composite returned by the read path: metadata always, content on request
#[derive(Debug, Clone, PartialEq)]
pub struct SecretView {
    pub metadata: SecretMetadata,
    pub content: Option<String>,
}

/// Cache-aside repository over the secret lifecycle.
#[derive(Clone)]
pub struct SecretService {
    secrets: Arc<dyn SecretRepository>,
    access_logs: Arc<dyn AccessLogRepository>,
    shares: Arc<dyn ShareRepository>,
    audit: Arc<AuditLogRepository>,
    cache: Arc<dyn CacheStore>,
    limiter: RateLimiter,
    evaluator: AccessEvaluator,
    argon2: Arc<Argon2<'static>>,
    cache_cfg: CacheConfig,
}

impl SecretService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        secrets: Arc<dyn SecretRepository>,
        access_logs: Arc<dyn AccessLogRepository>,
        shares: Arc<dyn ShareRepository>,
        audit: Arc<AuditLogRepository>,
        cache: Arc<dyn CacheStore>,
        limiter: RateLimiter,
        cache_cfg: CacheConfig,
    ) -> Self {
        let argon2 = Arc::new(hashing::password_hasher());
        Self {
            secrets,
            access_logs,
            shares,
            audit,
            cache,
            limiter,
            evaluator: AccessEvaluator::new(Arc::clone(&argon2)),
            argon2,
            cache_cfg,
        }
    }

    /// Wire the service against sqlx repositories on one pool
    pub fn with_sqlx(
        pool: crate::storage::DbPool,
        cache: Arc<dyn CacheStore>,
        limiter: RateLimiter,
        cache_cfg: CacheConfig,
    ) -> Self {
        Self::new(
            Arc::new(crate::storage::SqlxSecretRepository::new(pool.clone())),
            Arc::new(crate::storage::SqlxAccessLogRepository::new(pool.clone())),
            Arc::new(crate::storage::SqlxShareRepository::new(pool.clone())),
            Arc::new(AuditLogRepository::new(pool)),
            cache,
            limiter,
            cache_cfg,
        )
    }

    /// Read a secret through the cache.
    ///
    /// Metadata is consulted first; when content was requested, a miss on
    /// either half is treated as a full miss and the store is read instead.
    /// The store result repopulates both cache halves independently. A cache
    /// backend failure never fails the read.
    #[instrument(skip(self), fields(secret_id = %id), name = "get_secret")]
    pub async fn get_secret(&self, id: &SecretId, include_content: bool) -> Result<SecretView> {
        let meta_key = keys::secret_metadata(id);
        let content_key = keys::secret_content(id);

        let (cached_meta, cached_content) = if include_content {
            match self.cache.multi_get(&[meta_key.clone(), content_key.clone()]).await {
                Ok(mut values) => {
                    let content = values.pop().flatten();
                    let meta = values.pop().flatten();
                    (meta, content)
                }
                Err(err) => {
                    warn!(error = %err, secret_id = %id, "Cache read failed, falling back to store");
                    (None, None)
                }
            }
        } else {
            match self.cache.get(&meta_key).await {
                Ok(meta) => (meta, None),
                Err(err) => {
                    warn!(error = %err, secret_id = %id, "Cache read failed, falling back to store");
                    (None, None)
                }
            }
        };

        if let Some(metadata) =
            cached_meta.as_deref().and_then(|raw| serde_json::from_str::<SecretMetadata>(raw).ok())
        {
            if !include_content {
                return Ok(SecretView { metadata, content: None });
            }
            if let Some(content) = cached_content {
                return Ok(SecretView { metadata, content: Some(content) });
            }
        }

        // Full miss: the store is the source of truth. No negative caching.
        let secret = self
            .secrets
            .find_by_id(id)
            .await?
            .ok_or_else(|| SecureShareError::not_found("secret", id.as_str()))?;

        self.prime_cache(&secret).await;

        Ok(SecretView {
            metadata: secret.metadata(),
            content: include_content.then_some(secret.content),
        })
    }

    /// Create a secret owned by `owner`.
    #[instrument(skip(self, request), fields(owner = %owner), name = "create_secret")]
    pub async fn create_secret(
        &self,
        owner: &UserId,
        request: CreateSecretRequest,
    ) -> Result<Secret> {
        request.validate().map_err(SecureShareError::from)?;

        let decision = self
            .limiter
            .check(LimitKind::CreateSecret, &format!("user:{}", owner))
            .await;
        if !decision.allowed {
            return Err(rate_limit_error(decision));
        }

        let password_hash = match request.password.as_deref() {
            Some(password) => Some(hashing::hash_password(&self.argon2, password)?),
            None => None,
        };

        let secret = self
            .secrets
            .insert(NewSecret {
                id: SecretId::new(),
                title: request.title,
                description: request.description,
                content: request.content,
                kind: request.kind,
                file_name: request.file_name,
                password_hash,
                expires_at: request.expires_at,
                delete_after_view: request.delete_after_view,
                max_views: request.max_views,
                is_public: request.is_public,
                created_by: owner.clone(),
            })
            .await?;

        self.prime_cache(&secret).await;
        self.invalidate_listing(owner).await;

        self.audit
            .record_secret_event(AuditEvent::secret(
                "create",
                &secret.id,
                Some(owner),
                json!({
                    "kind": secret.kind.as_str(),
                    "one_time": secret.delete_after_view,
                    "has_password": secret.has_password(),
                }),
            ))
            .await?;

        Ok(secret)
    }

    /// One access attempt against a secret.
    ///
    /// On grant the view increment is persisted atomically, the attempt is
    /// access-logged and audited, and the cache is refreshed (or purged for a
    /// consumed one-time secret). On denial nothing mutates and the specific
    /// reason propagates.
    #[instrument(
        skip(self, ctx),
        fields(secret_id = %id, ip = %ctx.ip_address),
        name = "access_secret"
    )]
    pub async fn access_secret(&self, id: &SecretId, ctx: AccessContext) -> Result<Secret> {
        let decision = self
            .limiter
            .check(LimitKind::ViewSecret, &format!("ip:{}", ctx.ip_address))
            .await;
        if !decision.allowed {
            return Err(rate_limit_error(decision));
        }

        // The view-limit gate must see the persisted count, so this read
        // bypasses the cache entirely.
        let secret = self
            .secrets
            .find_by_id(id)
            .await?
            .ok_or_else(|| SecureShareError::not_found("secret", id.as_str()))?;

        let grant = self.evaluator.evaluate(&secret, chrono::Utc::now(), ctx.password.as_deref())?;

        let new_count = self.secrets.increment_views(id).await?;

        self.access_logs
            .append(NewAccessLogEntry {
                secret_id: id.clone(),
                user_id: ctx.user_id.clone(),
                ip_address: ctx.ip_address,
                user_agent: ctx.user_agent,
            })
            .await?;

        self.audit
            .record_secret_event(AuditEvent::secret(
                "view",
                id,
                ctx.user_id.as_ref(),
                json!({ "views": new_count }),
            ))
            .await?;

        let mut accessed = secret;
        accessed.current_views = new_count;

        if grant.deactivate {
            self.secrets.deactivate(id).await?;
            accessed.is_active = false;
            // A consumed one-time secret leaves the cache entirely
            self.purge_cache(id).await;
        } else {
            self.write_metadata_cache(&accessed.metadata()).await;
        }

        Ok(accessed)
    }

    /// Update a secret's content or settings. Owner only; a missing secret
    /// and a non-owned secret are indistinguishable to the caller.
    #[instrument(skip(self, request), fields(secret_id = %id, actor = %actor), name = "update_secret")]
    pub async fn update_secret(
        &self,
        id: &SecretId,
        actor: &UserId,
        request: UpdateSecretRequest,
    ) -> Result<Secret> {
        request.validate_fields()?;
        self.load_owned(id, actor).await?;

        let password_hash = match request.password {
            None => None,
            Some(None) => Some(None),
            Some(Some(password)) => Some(Some(hashing::hash_password(&self.argon2, &password)?)),
        };

        let updated = self
            .secrets
            .update(
                id,
                SecretUpdate {
                    title: request.title,
                    description: request.description,
                    content: request.content,
                    file_name: request.file_name,
                    password_hash,
                    expires_at: request.expires_at,
                    delete_after_view: request.delete_after_view,
                    max_views: request.max_views,
                    is_public: request.is_public,
                },
            )
            .await?;

        self.prime_cache(&updated).await;
        self.invalidate_listing(actor).await;

        self.audit
            .record_secret_event(AuditEvent::secret("update", id, Some(actor), json!({})))
            .await?;

        Ok(updated)
    }

    /// Soft-delete a secret. Owner only, same no-leak pattern as update.
    #[instrument(skip(self), fields(secret_id = %id, actor = %actor), name = "delete_secret")]
    pub async fn delete_secret(&self, id: &SecretId, actor: &UserId) -> Result<()> {
        self.load_owned(id, actor).await?;

        self.secrets.deactivate(id).await?;
        self.purge_cache(id).await;
        self.invalidate_listing(actor).await;

        self.audit
            .record_secret_event(AuditEvent::secret("delete", id, Some(actor), json!({})))
            .await?;

        Ok(())
    }

    /// List the caller's active secrets, newest first, as metadata.
    #[instrument(skip(self), fields(user = %user), name = "list_user_secrets")]
    pub async fn list_user_secrets(&self, user: &UserId) -> Result<Vec<SecretMetadata>> {
        let key = keys::user_secrets(user);

        match self.cache.get(&key).await {
            Ok(Some(raw)) => {
                if let Ok(listing) = serde_json::from_str::<Vec<SecretMetadata>>(&raw) {
                    return Ok(listing);
                }
            }
            Ok(None) => {}
            Err(err) => {
                warn!(error = %err, user = %user, "Listing cache read failed, falling back to store");
            }
        }

        let secrets = self.secrets.list_active_by_owner(user).await?;
        let listing: Vec<SecretMetadata> = secrets.iter().map(Secret::metadata).collect();

        match serde_json::to_string(&listing) {
            Ok(raw) => {
                if let Err(err) = self.cache.set(&key, &raw, self.cache_cfg.listing_ttl()).await {
                    warn!(error = %err, user = %user, "Failed to cache secret listing");
                }
            }
            Err(err) => warn!(error = %err, user = %user, "Failed to serialize secret listing"),
        }

        Ok(listing)
    }

    /// Record that the owner shared a secret with a recipient email.
    #[instrument(skip(self), fields(secret_id = %id, actor = %actor), name = "share_secret")]
    pub async fn share_secret(
        &self,
        id: &SecretId,
        actor: &UserId,
        recipient_email: &str,
    ) -> Result<SharedSecret> {
        if !recipient_email.validate_email() {
            return Err(SecureShareError::validation_field(
                "Invalid recipient email",
                "shared_with_email",
            ));
        }

        self.load_owned(id, actor).await?;

        let decision =
            self.limiter.check(LimitKind::ShareSecret, &format!("user:{}", actor)).await;
        if !decision.allowed {
            return Err(rate_limit_error(decision));
        }

        let share = self
            .shares
            .insert(NewSharedSecret {
                secret_id: id.clone(),
                shared_by: actor.clone(),
                shared_with_email: recipient_email.to_string(),
            })
            .await?;

        self.audit
            .record_secret_event(AuditEvent::secret(
                "share",
                id,
                Some(actor),
                json!({ "recipient": recipient_email }),
            ))
            .await?;

        Ok(share)
    }

    /// Owner-gated view of a secret's append-only access log, newest first.
    #[instrument(skip(self), fields(secret_id = %id, actor = %actor), name = "list_access_logs")]
    pub async fn list_access_logs(
        &self,
        id: &SecretId,
        actor: &UserId,
        limit: i64,
    ) -> Result<Vec<AccessLogEntry>> {
        self.load_owned(id, actor).await?;
        self.access_logs.list_for_secret(id, limit).await
    }

    async fn load_owned(&self, id: &SecretId, actor: &UserId) -> Result<Secret> {
        match self.secrets.find_by_id(id).await? {
            Some(secret) if secret.created_by == *actor => Ok(secret),
            // Absent and not-owned collapse into one error kind
            _ => Err(SecureShareError::unauthorized("Secret not found or not owned by caller")),
        }
    }

    /// Write both cache halves for a secret, store-write-first having already
    /// happened. Failures are logged and swallowed.
    async fn prime_cache(&self, secret: &Secret) {
        self.write_metadata_cache(&secret.metadata()).await;

        let content_key = keys::secret_content(&secret.id);
        if let Err(err) =
            self.cache.set(&content_key, &secret.content, self.cache_cfg.content_ttl()).await
        {
            warn!(error = %err, secret_id = %secret.id, "Failed to cache secret content");
        }
    }

    async fn write_metadata_cache(&self, metadata: &SecretMetadata) {
        let meta_key = keys::secret_metadata(&metadata.id);
        match serde_json::to_string(metadata) {
            Ok(raw) => {
                if let Err(err) =
                    self.cache.set(&meta_key, &raw, self.cache_cfg.metadata_ttl()).await
                {
                    warn!(error = %err, secret_id = %metadata.id, "Failed to cache secret metadata");
                }
            }
            Err(err) => {
                warn!(error = %err, secret_id = %metadata.id, "Failed to serialize secret metadata");
            }
        }
    }

    /// Remove both cache halves for a secret. Failures are logged and
    /// swallowed.
    async fn purge_cache(&self, id: &SecretId) {
        for key in [keys::secret_metadata(id), keys::secret_content(id)] {
            if let Err(err) = self.cache.delete(&key).await {
                warn!(error = %err, secret_id = %id, "Failed to evict cached secret");
            }
        }
    }

    async fn invalidate_listing(&self, user: &UserId) {
        if let Err(err) = self.cache.delete(&keys::user_secrets(user)).await {
            warn!(error = %err, user = %user, "Failed to invalidate cached secret listing");
        }
    }
}

fn rate_limit_error(decision: RateLimitDecision) -> SecureShareError {
    SecureShareError::rate_limited(decision.retry_after_secs(), decision.reset_at_ms)
}

impl std::fmt::Debug for SecretService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretService").field("cache_cfg", &self.cache_cfg).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCacheStore;
    use crate::config::RateLimitConfig;
    use crate::storage::test_helpers::{seed_user, test_pool};
    use async_trait::async_trait;
    use std::time::Duration;

    /// Cache stub whose every operation fails, for degradation tests
    struct DownCache;

    #[async_trait]
    impl CacheStore for DownCache {
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(SecureShareError::cache("down"))
        }
        async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<()> {
            Err(SecureShareError::cache("down"))
        }
        async fn delete(&self, _key: &str) -> Result<()> {
            Err(SecureShareError::cache("down"))
        }
        async fn increment(&self, _key: &str) -> Result<i64> {
            Err(SecureShareError::cache("down"))
        }
        async fn expire(&self, _key: &str, _ttl: Duration) -> Result<()> {
            Err(SecureShareError::cache("down"))
        }
        async fn exists(&self, _key: &str) -> Result<bool> {
            Err(SecureShareError::cache("down"))
        }
        async fn multi_get(&self, _keys: &[String]) -> Result<Vec<Option<String>>> {
            Err(SecureShareError::cache("down"))
        }
    }

    fn request(title: &str) -> CreateSecretRequest {
        CreateSecretRequest {
            title: title.to_string(),
            description: None,
            content: "payload".to_string(),
            kind: SecretKind::Text,
            file_name: None,
            password: None,
            expires_at: None,
            delete_after_view: false,
            max_views: None,
            is_public: false,
        }
    }

    async fn service_with_cache(cache: Arc<dyn CacheStore>) -> (SecretService, UserId) {
        let pool = test_pool().await;
        let owner = seed_user(&pool, "owner@example.com").await;
        let limiter = RateLimiter::new(Arc::clone(&cache), RateLimitConfig::default());
        let service =
            SecretService::with_sqlx(pool, cache, limiter, crate::config::CacheConfig::default());
        (service, owner)
    }

    #[tokio::test]
    async fn test_reads_degrade_when_cache_is_down() {
        let (service, owner) = service_with_cache(Arc::new(DownCache)).await;

        let created = service.create_secret(&owner, request("s")).await.unwrap();

        // Every cache op fails, yet the read path still serves from the store
        let view = service.get_secret(&created.id, true).await.unwrap();
        assert_eq!(view.content.as_deref(), Some("payload"));
        assert_eq!(view.metadata.id, created.id);

        // And access attempts still work: the limiter fails open too
        let accessed = service
            .access_secret(
                &created.id,
                AccessContext {
                    ip_address: "10.0.0.1".to_string(),
                    user_agent: "test".to_string(),
                    user_id: None,
                    password: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(accessed.current_views, 1);
    }

    #[tokio::test]
    async fn test_listing_degrades_when_cache_is_down() {
        let (service, owner) = service_with_cache(Arc::new(DownCache)).await;
        service.create_secret(&owner, request("s")).await.unwrap();

        let listing = service.list_user_secrets(&owner).await.unwrap();
        assert_eq!(listing.len(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_cached_metadata_is_a_miss() {
        let cache = Arc::new(MemoryCacheStore::new());
        let (service, owner) = service_with_cache(cache.clone()).await;
        let created = service.create_secret(&owner, request("s")).await.unwrap();

        cache
            .set(&keys::secret_metadata(&created.id), "not json", Duration::from_secs(60))
            .await
            .unwrap();

        let view = service.get_secret(&created.id, false).await.unwrap();
        assert_eq!(view.metadata.title, "s");
    }

    #[tokio::test]
    async fn test_create_validates_request() {
        let (service, owner) = service_with_cache(Arc::new(MemoryCacheStore::new())).await;

        let err = service.create_secret(&owner, request("")).await.unwrap_err();
        assert!(matches!(err, SecureShareError::Validation { .. }));

        let mut bad_views = request("ok");
        bad_views.max_views = Some(0);
        let err = service.create_secret(&owner, bad_views).await.unwrap_err();
        assert!(matches!(err, SecureShareError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_share_rejects_bad_email() {
        let (service, owner) = service_with_cache(Arc::new(MemoryCacheStore::new())).await;
        let created = service.create_secret(&owner, request("s")).await.unwrap();

        let err = service.share_secret(&created.id, &owner, "not-an-email").await.unwrap_err();
        assert!(matches!(err, SecureShareError::Validation { .. }));
    }
}
