//! Secret domain model and its cacheable metadata projection.

use crate::domain::{SecretId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of content a secret carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretKind {
    Text,
    File,
}

impl SecretKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecretKind::Text => "text",
            SecretKind::File => "file",
        }
    }
}

impl fmt::Display for SecretKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SecretKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(SecretKind::Text),
            "file" => Ok(SecretKind::File),
            other => Err(format!("unknown secret kind: {}", other)),
        }
    }
}

/// A shareable unit of content with its access-control attributes.
///
/// `current_views` never decreases, and `is_active = false` is terminal:
/// normal flows never physically delete a secret, they deactivate it.
#[derive(Debug, Clone)]
pub struct Secret {
    pub id: SecretId,
    pub title: String,
    pub description: Option<String>,
    pub content: String,
    pub kind: SecretKind,
    pub file_name: Option<String>,
    /// Argon2id hash of the access password, when one is set
    pub password_hash: Option<String>,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
    pub delete_after_view: bool,
    pub max_views: Option<i64>,
    pub current_views: i64,
    pub is_active: bool,
    pub is_public: bool,
    pub created_by: UserId,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Secret {
    /// Whether a password must be supplied to access this secret
    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }

    /// Derive the cacheable metadata projection (no content, no hash)
    pub fn metadata(&self) -> SecretMetadata {
        SecretMetadata {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            kind: self.kind,
            file_name: self.file_name.clone(),
            has_password: self.has_password(),
            expires_at: self.expires_at,
            delete_after_view: self.delete_after_view,
            max_views: self.max_views,
            current_views: self.current_views,
            is_active: self.is_active,
            is_public: self.is_public,
            created_by: self.created_by.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Time-bounded projection of [`Secret`] excluding the content and the
/// password hash. This is what gets cached and what listings return; it may
/// be stale relative to the store for up to the metadata TTL and is never
/// treated as the source of truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretMetadata {
    pub id: SecretId,
    pub title: String,
    pub description: Option<String>,
    pub kind: SecretKind,
    pub file_name: Option<String>,
    pub has_password: bool,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
    pub delete_after_view: bool,
    pub max_views: Option<i64>,
    pub current_views: i64,
    pub is_active: bool,
    pub is_public: bool,
    pub created_by: UserId,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_secret(password_hash: Option<String>) -> Secret {
        let now = chrono::Utc::now();
        Secret {
            id: SecretId::new(),
            title: "deploy key".to_string(),
            description: None,
            content: "s3cr3t-payload".to_string(),
            kind: SecretKind::Text,
            file_name: None,
            password_hash,
            expires_at: None,
            delete_after_view: false,
            max_views: Some(5),
            current_views: 2,
            is_active: true,
            is_public: false,
            created_by: UserId::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn metadata_excludes_content_and_derives_has_password() {
        let secret = sample_secret(Some("$argon2id$...".to_string()));
        let metadata = secret.metadata();

        assert!(metadata.has_password);
        assert_eq!(metadata.id, secret.id);
        assert_eq!(metadata.current_views, 2);

        let json = serde_json::to_string(&metadata).unwrap();
        assert!(!json.contains("s3cr3t-payload"));
        assert!(!json.contains("argon2id"));
    }

    #[test]
    fn metadata_without_password() {
        let secret = sample_secret(None);
        assert!(!secret.metadata().has_password);
    }

    #[test]
    fn metadata_round_trips_through_json() {
        let metadata = sample_secret(None).metadata();
        let json = serde_json::to_string(&metadata).unwrap();
        let decoded: SecretMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(metadata, decoded);
    }

    #[test]
    fn secret_kind_round_trip() {
        for kind in [SecretKind::Text, SecretKind::File] {
            let parsed: SecretKind = kind.as_str().parse().unwrap();
            assert_eq!(kind, parsed);
        }
        assert!("blob".parse::<SecretKind>().is_err());
    }
}
