//! Argon2 password hashing.

use argon2::{
    Argon2,
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use rand_core::OsRng;

use crate::error::{DomainError, Result};

/// Hashes a plain-text password with a fresh random salt.
#[tracing::instrument(skip(password))]
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| DomainError::Crypto(format!("password hashing failed: {e}")))
}

/// Checks a plain-text password against a stored PHC hash string.
///
/// A mismatch is `Ok(false)`; a malformed stored hash is an error.
#[tracing::instrument(skip_all)]
pub fn verify_password(hash: &str, password: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| DomainError::Crypto(format!("stored password hash is invalid: {e}")))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(DomainError::Crypto(format!(
            "password verification failed: {e}"
        ))),
    }
}
