//! JWT issuance and validation for the mock server

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::header;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, VigilError};

/// JWT claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (username)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
}

impl Claims {
    pub fn new(username: &str, expiry_hours: i64) -> Self {
        let now = Utc::now();
        Self {
            sub: username.to_string(),
            exp: (now + Duration::hours(expiry_hours)).timestamp(),
            iat: now.timestamp(),
        }
    }
}

/// JWT handler
///
/// If the secret is empty, generates a secure random secret; tokens then
/// only validate against this process, which is all a fixture needs.
#[derive(Clone)]
pub struct JwtAuth {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtAuth {
    pub fn new(secret: &str) -> Self {
        let key = if secret.is_empty() {
            let mut key_bytes = [0u8; 32];
            OsRng
                .try_fill_bytes(&mut key_bytes)
                .expect("FATAL: failed to generate random JWT key; system entropy unavailable");
            debug!("generated random JWT secret");
            key_bytes.to_vec()
        } else {
            secret.as_bytes().to_vec()
        };

        Self {
            encoding_key: EncodingKey::from_secret(&key),
            decoding_key: DecodingKey::from_secret(&key),
        }
    }

    /// Generate a token for the given user
    pub fn generate_token(&self, username: &str, expiry_hours: i64) -> Result<String> {
        let claims = Claims::new(username, expiry_hours);
        Ok(encode(&Header::default(), &claims, &self.encoding_key)?)
    }

    /// Validate a token and return its claims
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let validation = Validation::default();
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!("JWT validation failed: {}", e);
                VigilError::SessionExpired
            })
    }

    /// Extract the token from an Authorization header value
    pub fn extract_token(authorization: &str) -> Option<&str> {
        authorization.strip_prefix("Bearer ")
    }
}

/// Extractor for authenticated REST requests
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub username: String,
    pub claims: Claims,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = VigilError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(VigilError::MissingAuthHeader)?;

        let token = JwtAuth::extract_token(auth_header).ok_or(VigilError::InvalidAuthHeader)?;

        let jwt_auth = parts
            .extensions
            .get::<JwtAuth>()
            .ok_or_else(|| VigilError::Internal("JwtAuth extension missing".to_string()))?;

        let claims = jwt_auth.validate_token(token)?;

        Ok(AuthenticatedUser {
            username: claims.sub.clone(),
            claims,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jwt_generation_and_validation() {
        let auth = JwtAuth::new("test-secret");

        let token = auth.generate_token("admin", 24).unwrap();
        let claims = auth.validate_token(&token).unwrap();

        assert_eq!(claims.sub, "admin");
    }

    #[test]
    fn test_jwt_random_secret() {
        let auth = JwtAuth::new("");
        let token = auth.generate_token("admin", 24).unwrap();
        let claims = auth.validate_token(&token).unwrap();

        assert_eq!(claims.sub, "admin");
    }

    #[test]
    fn test_jwt_invalid_token_rejected() {
        let auth = JwtAuth::new("test-secret");
        assert!(auth.validate_token("invalid.token.here").is_err());
    }

    #[test]
    fn test_jwt_cross_secret_rejected() {
        let auth_a = JwtAuth::new("secret-a");
        let auth_b = JwtAuth::new("secret-b");

        let token = auth_a.generate_token("admin", 24).unwrap();
        assert!(auth_b.validate_token(&token).is_err());
    }

    #[test]
    fn test_extract_token() {
        assert_eq!(JwtAuth::extract_token("Bearer abc123"), Some("abc123"));
        assert_eq!(JwtAuth::extract_token("Basic abc123"), None);
    }
}
