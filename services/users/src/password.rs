//! Password hashing with argon2

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};

use std::sync::OnceLock;

use crate::error::{UserError, UserResult};

pub(crate) const DECOY_PASSWORD: &str = "decoy-password-never-issued";

/// Hashes and verifies user credentials
#[derive(Clone, Default)]
pub struct PasswordService {
    argon2: Argon2<'static>,
}

impl PasswordService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash a plaintext password with a fresh salt
    pub fn hash(&self, password: &str) -> UserResult<String> {
        let salt = SaltString::generate(&mut rand::thread_rng());
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| UserError::Internal(format!("Failed to hash password: {}", e)))?
            .to_string();

        Ok(hash)
    }

    /// Check a plaintext password against a stored hash
    ///
    /// A malformed stored hash never matches.
    pub fn matches(&self, password: &str, password_hash: &str) -> bool {
        match PasswordHash::new(password_hash) {
            Ok(parsed) => self
                .argon2
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }

    /// Verify `password` against a hash no account owns
    ///
    /// Gives a lookup miss the same argon2 cost as a wrong password.
    pub fn verify_decoy(&self, password: &str) {
        if let Some(decoy) = self.decoy_hash() {
            let _ = self.matches(password, decoy);
        }
    }

    fn decoy_hash(&self) -> Option<&'static str> {
        static DECOY_HASH: OnceLock<Option<String>> = OnceLock::new();
        DECOY_HASH
            .get_or_init(|| self.hash(DECOY_PASSWORD).ok())
            .as_deref()
    }
}
