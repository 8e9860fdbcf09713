//! Bearer token issuing and verification (HS256).
//!
//! The lifecycle core never sees tokens; the HTTP layer verifies them here
//! and hands the resulting [`Caller`] inward.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::models::{Caller, Role, UserId};
use crate::services::ServiceError;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("unknown role id {0}")]
    UnknownRole(i32),
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        ServiceError::Unauthenticated(err.to_string())
    }
}

/// JWT claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    pub role_id: i32,
    /// Issued at (unix seconds).
    pub iat: i64,
    /// Expiration time (unix seconds).
    pub exp: i64,
}

impl Claims {
    pub fn new(user_id: UserId, role: Role, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.value(),
            role_id: role.id(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }

    pub fn caller(&self) -> Result<Caller, AuthError> {
        let role = Role::from_id(self.role_id).ok_or(AuthError::UnknownRole(self.role_id))?;
        Ok(Caller::new(self.user_id, role))
    }
}

/// JWT manager
pub struct JwtManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtManager {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
        }
    }

    pub fn issue(&self, user_id: UserId, role: Role, ttl: Duration) -> Result<String, AuthError> {
        self.encode(&Claims::new(user_id, role, ttl))
    }

    pub fn encode(&self, claims: &Claims) -> Result<String, AuthError> {
        Ok(encode(&Header::default(), claims, &self.encoding)?)
    }

    /// Verify signature and expiry.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        Ok(decode::<Claims>(token, &self.decoding, &self.validation)?.claims)
    }

    /// Verify a token and resolve it to the caller it identifies.
    pub fn authenticate(&self, token: &str) -> Result<Caller, AuthError> {
        self.verify(token)?.caller()
    }
}
