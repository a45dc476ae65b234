//! Password hashing for secret access control.

pub mod hashing;

pub use hashing::{hash_password, password_hasher, verify_password};
