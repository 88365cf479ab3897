// ============================
// crates/backend-lib/src/auth/password.rs
// ============================
//! Password hashing and verification.
use scrypt::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
    },
    Params, Scrypt,
};
use thiserror::Error;

use crate::config::HasherSettings;

#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("Invalid scrypt parameters: {0}")]
    InvalidParams(String),
    #[error("Hash error: {0}")]
    HashError(String),
}

/// Salted scrypt hasher producing PHC strings
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    /// Create a hasher with explicit scrypt cost parameters
    pub fn new(log_n: u8, r: u32, p: u32) -> Result<Self, PasswordError> {
        let params = Params::new(log_n, r, p, Params::RECOMMENDED_LEN)
            .map_err(|e| PasswordError::InvalidParams(e.to_string()))?;
        Ok(Self { params })
    }

    pub fn from_settings(settings: &HasherSettings) -> Result<Self, PasswordError> {
        Self::new(settings.log_n, settings.r, settings.p)
    }

    /// Hash a password with a fresh random salt
    pub fn hash(&self, plain: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        Scrypt
            .hash_password_customized(plain.as_bytes(), None, None, self.params, &salt)
            .map(|h| h.to_string())
            .map_err(|e| PasswordError::HashError(e.to_string()))
    }

    /// Verify a password against a stored hash.
    /// The cost parameters are read from the hash itself.
    pub fn verify(&self, hash: &str, plain: &str) -> bool {
        let parsed_hash = match PasswordHash::new(hash) {
            Ok(h) => h,
            Err(_) => return false,
        };
        Scrypt.verify_password(plain.as_bytes(), &parsed_hash).is_ok()
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            params: Params::recommended(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> PasswordHasher {
        PasswordHasher::new(4, 8, 1).unwrap()
    }

    #[test]
    fn test_password_hashing_and_verification() {
        let hasher = cheap();
        let hash = hasher.hash("secret123").unwrap();

        assert_ne!(hash, "secret123");
        assert!(hash.starts_with("$scrypt$"));
        assert!(hasher.verify(&hash, "secret123"));
        assert!(!hasher.verify(&hash, "secret124"));
    }

    #[test]
    fn test_hashes_are_salted() {
        let hasher = cheap();
        let first = hasher.hash("same").unwrap();
        let second = hasher.hash("same").unwrap();
        assert_ne!(first, second);
        assert!(hasher.verify(&first, "same"));
        assert!(hasher.verify(&second, "same"));
    }

    #[test]
    fn test_garbage_hash_never_verifies() {
        assert!(!cheap().verify("not-a-phc-string", "anything"));
        assert!(!cheap().verify("", ""));
    }

    #[test]
    fn test_invalid_params_rejected() {
        assert!(matches!(
            PasswordHasher::new(4, 0, 1),
            Err(PasswordError::InvalidParams(_))
        ));
    }
}
