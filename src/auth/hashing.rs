//! Argon2id hashing for secret access passwords.

use crate::errors::{Result, SecureShareError};
use argon2::{
    password_hash::SaltString, Algorithm, Argon2, Params, PasswordHash, PasswordHasher,
    PasswordVerifier, Version,
};
use rand::rngs::OsRng;

pub fn password_hasher() -> Argon2<'static> {
    // Tuned for interactive API calls: Argon2id with moderate memory and a single iteration
    // keeps verification under 10ms on development hardware while retaining side-channel
    // protections.
    const MEMORY_COST_KIB: u32 = 768;
    const ITERATIONS: u32 = 1;
    const PARALLELISM: u32 = 1;
    let params = Params::new(MEMORY_COST_KIB, ITERATIONS, PARALLELISM, Some(32))
        .expect("valid Argon2 parameters");
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
}

/// Hash an access password with a fresh salt
pub fn hash_password(argon2: &Argon2<'_>, password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| SecureShareError::internal(format!("Failed to hash password: {}", err)))?;
    Ok(hash.to_string())
}

/// Verify a candidate password against a stored hash.
///
/// Comparison happens inside the argon2 crate in constant time; a mismatch is
/// `Ok(false)`, only a malformed stored hash is an error.
pub fn verify_password(argon2: &Argon2<'_>, stored: &str, candidate: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored)
        .map_err(|err| SecureShareError::internal(format!("Invalid password hash: {}", err)))?;
    Ok(argon2.verify_password(candidate.as_bytes(), &parsed).is_ok())
}
