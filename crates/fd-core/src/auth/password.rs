//! Password hashing utilities using Argon2.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use thiserror::Error;

/// Password hashing errors.
#[derive(Error, Debug)]
pub enum PasswordError {
    /// Error during password hashing.
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// Error during password verification.
    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    /// Invalid password hash format.
    #[error("Invalid password hash format")]
    InvalidHash,
}

/// Hashes a password using Argon2id, returning a PHC format string.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::HashError(e.to_string()))
}

/// Verifies a password against a stored PHC hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHash)?;

    let argon2 = Argon2::default();

    match argon2.verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("hunter2-but-longer").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("hunter2-but-longer", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn test_invalid_hash_rejected() {
        assert!(matches!(
            verify_password("whatever", "not-a-hash"),
            Err(PasswordError::InvalidHash)
        ));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("same-password").unwrap();
        let b = hash_password("same-password").unwrap();
        assert_ne!(a, b);
    }
}
