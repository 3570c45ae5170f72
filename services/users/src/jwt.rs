//! JWT service for token generation and validation
//!
//! Tokens are signed with HS256 using a secret generated once per process.
//! Restarting the service therefore invalidates every token it issued.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

use crate::error::{UserError, UserResult};
use crate::models::User;
use crate::models::role::ROLE_ADMIN;

const SECRET_LEN: usize = 64;

/// Process-scoped signing secret
#[derive(Clone)]
pub struct JwtKey {
    secret: Arc<[u8]>,
}

impl JwtKey {
    /// Generate a fresh random secret
    pub fn generate() -> Self {
        let mut secret = vec![0u8; SECRET_LEN];
        rand::thread_rng().fill_bytes(&mut secret);
        info!("Generated process-scoped JWT signing key");
        Self {
            secret: secret.into(),
        }
    }

    /// Use a caller-supplied secret
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

/// JWT claims structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Username of the authenticated user
    pub sub: String,
    /// User roles
    pub roles: Vec<String>,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
}

impl Claims {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ROLE_ADMIN)
    }
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    expiry_seconds: u64,
}

impl JwtService {
    /// Initialize a new JWT service
    pub fn new(key: &JwtKey, expiry_seconds: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        JwtService {
            encoding_key: EncodingKey::from_secret(&key.secret),
            decoding_key: DecodingKey::from_secret(&key.secret),
            validation,
            expiry_seconds,
        }
    }

    /// Generate a token for a user, carrying its role names
    pub fn generate_token(&self, user: &User) -> UserResult<String> {
        let now = now_secs()?;
        let claims = Claims {
            sub: user.username.clone(),
            roles: user.role_names(),
            iat: now,
            exp: now.saturating_add(self.expiry_seconds),
        };

        self.encode_claims(&claims)
    }

    fn encode_claims(&self, claims: &Claims) -> UserResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| UserError::Internal(format!("Failed to sign token: {}", e)))
    }

    /// Validate a token and return the claims
    pub fn validate_token(&self, token: &str) -> UserResult<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|_| UserError::Unauthorized)?;
        Ok(token_data.claims)
    }
}

fn now_secs() -> UserResult<u64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| UserError::Internal(format!("Failed to get current time: {}", e)))
}
