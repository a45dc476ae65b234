//! Repository modules for data access
//!
//! Each repository handles persistence for a specific resource type.

pub mod access_log;
pub mod audit_log;
pub mod secret;
pub mod share;
pub mod user;

pub use access_log::{
    AccessLogEntry, AccessLogRepository, NewAccessLogEntry, SqlxAccessLogRepository,
};
pub use audit_log::{AuditEvent, AuditLogEntry, AuditLogRepository};
pub use secret::{NewSecret, SecretRepository, SecretUpdate, SqlxSecretRepository};
pub use share::{NewSharedSecret, ShareRepository, SharedSecret, SqlxShareRepository};
pub use user::{NewUser, SqlxUserRepository, User, UserRepository};
