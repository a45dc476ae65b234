//! Service layer composing storage, cache, rate limiting, and access control.

pub mod secret_service;

pub use secret_service::{
    AccessContext, CreateSecretRequest, SecretService, SecretView, UpdateSecretRequest,
};
