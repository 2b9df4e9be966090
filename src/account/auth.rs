//! Password credentials for accounts

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;

use crate::error::CredentialError;

/// One-way credential primitive
pub trait Credentials: Send + Sync {
    /// Derive a storable credential from a plaintext password.
    fn hash(&self, password: &str) -> Result<String, CredentialError>;

    /// Check a plaintext password against a stored credential.
    fn verify(&self, password: &str, credential: &str) -> bool;
}

/// Argon2id with default parameters and a random salt per hash
#[derive(Debug, Clone, Default)]
pub struct Argon2Credentials;

impl Credentials for Argon2Credentials {
    fn hash(&self, password: &str) -> Result<String, CredentialError> {
        let salt = SaltString::generate(&mut OsRng);

        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| CredentialError::HashFailed(e.to_string()))
    }

    fn verify(&self, password: &str, credential: &str) -> bool {
        let parsed_hash = match PasswordHash::new(credential) {
            Ok(hash) => hash,
            Err(_) => return false,
        };

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hashing() {
        let credentials = Argon2Credentials;
        let hash = credentials.hash("secret1").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("secret1"));
        assert!(credentials.verify("secret1", &hash));
        assert!(!credentials.verify("wrong_password", &hash));
    }

    #[test]
    fn test_salts_differ() {
        let credentials = Argon2Credentials;
        let a = credentials.hash("secret1").unwrap();
        let b = credentials.hash("secret1").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_credential_does_not_verify() {
        assert!(!Argon2Credentials.verify("secret1", "not-a-phc-string"));
    }
}
