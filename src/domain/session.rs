use crate::error::{AppError, Result};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// JWT payload issued by the marketplace's auth system. The chat service
/// only verifies tokens; it never issues them outside of tests.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: usize,
}

impl Claims {
    #[must_use]
    pub fn new(user_id: Uuid, ttl_secs: u64) -> Self {
        let expiration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(std::time::Duration::from_secs(0))
            .as_secs() as usize
            + ttl_secs as usize;

        Self { sub: user_id, exp: expiration }
    }

    /// # Errors
    /// Returns `AppError::Internal` if signing fails.
    pub fn encode(&self, secret: &str) -> Result<String> {
        encode(&Header::default(), self, &EncodingKey::from_secret(secret.as_bytes()))
            .map_err(|_| AppError::Internal)
    }

    /// # Errors
    /// Returns `AppError::AuthError` for malformed, mis-signed, or expired tokens.
    pub fn decode(token: &str, secret: &str) -> Result<Self> {
        let token_data =
            decode::<Self>(token, &DecodingKey::from_secret(secret.as_bytes()), &Validation::default())
                .map_err(|_| AppError::AuthError)?;

        Ok(token_data.claims)
    }
}
