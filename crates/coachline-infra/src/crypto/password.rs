//! Argon2id password hashing.
//!
//! Implements the `PasswordHasher` trait from `coachline-core`. Hashes are
//! PHC strings (`$argon2id$v=19$...`) carrying their own random salt and
//! parameters, so stored hashes stay verifiable if the defaults change.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString};
use argon2::Argon2;
use coachline_core::service::credentials::PasswordHasher;
use coachline_types::error::AccountError;
use secrecy::{ExposeSecret, SecretString};

/// Argon2id with the crate's default (OWASP) parameters.
#[derive(Default)]
pub struct Argon2PasswordHasher {
    argon2: Argon2<'static>,
}

impl Argon2PasswordHasher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PasswordHasher for Argon2PasswordHasher {
    fn hash_password(&self, password: &SecretString) -> Result<String, AccountError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.expose_secret().as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|_| AccountError::Hashing)
    }

    fn verify_password(&self, password: &SecretString, hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            return false;
        };
        self.argon2
            .verify_password(password.expose_secret().as_bytes(), &parsed)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(s: &str) -> SecretString {
        SecretString::from(s.to_string())
    }

    #[test]
    fn test_hash_then_verify() {
        let hasher = Argon2PasswordHasher::new();
        let hash = hasher.hash_password(&secret("correct horse")).unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify_password(&secret("correct horse"), &hash));
        assert!(!hasher.verify_password(&secret("wrong horse"), &hash));
    }

    #[test]
    fn test_same_password_gets_different_salts() {
        let hasher = Argon2PasswordHasher::new();
        let a = hasher.hash_password(&secret("password1")).unwrap();
        let b = hasher.hash_password(&secret("password1")).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        let hasher = Argon2PasswordHasher::new();
        assert!(!hasher.verify_password(&secret("password1"), "not-a-phc-string"));
        assert!(!hasher.verify_password(&secret("password1"), ""));
    }
}
