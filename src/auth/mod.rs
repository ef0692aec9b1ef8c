pub mod password;
pub mod principal;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::SecurityConfig;

pub use principal::{authorize, Principal, UserPrincipal};

pub const ACCESS: &str = "access";
pub const REFRESH: &str = "refresh";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    pub username: String,
    pub token_type: String,
    pub jti: String,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid JWT secret")]
    InvalidSecret,

    #[error("Token is invalid or expired")]
    InvalidToken,

    #[error("Token has wrong type")]
    WrongTokenType,
}

/// Access + refresh token pair returned by the token endpoint
#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Issues and verifies HS256 tokens with the configured secret and lifetimes
#[derive(Clone)]
pub struct TokenIssuer {
    secret: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(security: &SecurityConfig) -> Self {
        Self {
            secret: security.jwt_secret.clone(),
            access_ttl: Duration::minutes(security.access_token_minutes),
            refresh_ttl: Duration::hours(security.refresh_token_hours),
        }
    }

    pub fn issue_pair(&self, user_id: i64, username: &str) -> Result<TokenPair, JwtError> {
        Ok(TokenPair {
            access: self.issue(user_id, username, ACCESS, self.access_ttl)?,
            refresh: self.issue(user_id, username, REFRESH, self.refresh_ttl)?,
        })
    }

    pub fn issue_access(&self, user_id: i64, username: &str) -> Result<String, JwtError> {
        self.issue(user_id, username, ACCESS, self.access_ttl)
    }

    fn issue(&self, user_id: i64, username: &str, token_type: &str, ttl: Duration) -> Result<String, JwtError> {
        if self.secret.is_empty() {
            return Err(JwtError::InvalidSecret);
        }

        let now = Utc::now();
        let claims = Claims {
            user_id,
            username: username.to_string(),
            token_type: token_type.to_string(),
            jti: Uuid::new_v4().simple().to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        };

        let encoding_key = EncodingKey::from_secret(self.secret.as_bytes());
        encode(&Header::new(Algorithm::HS256), &claims, &encoding_key)
            .map_err(|e| JwtError::TokenGeneration(e.to_string()))
    }

    /// Verify signature and expiry, and that the token is of `expected_type`
    pub fn decode(&self, token: &str, expected_type: &str) -> Result<Claims, JwtError> {
        if self.secret.is_empty() {
            return Err(JwtError::InvalidSecret);
        }

        let decoding_key = DecodingKey::from_secret(self.secret.as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
            tracing::debug!("Rejected token: {}", e);
            JwtError::InvalidToken
        })?;

        if token_data.claims.token_type != expected_type {
            return Err(JwtError::WrongTokenType);
        }
        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(&AppConfig::development().security)
    }

    #[test]
    fn pair_round_trips_with_types() {
        let issuer = issuer();
        let pair = issuer.issue_pair(7, "alice").unwrap();

        let access = issuer.decode(&pair.access, ACCESS).unwrap();
        assert_eq!(access.user_id, 7);
        assert_eq!(access.username, "alice");

        assert!(matches!(issuer.decode(&pair.access, REFRESH), Err(JwtError::WrongTokenType)));
        assert!(issuer.decode(&pair.refresh, REFRESH).is_ok());
    }

    #[test]
    fn rejects_tampered_and_foreign_tokens() {
        let issuer = issuer();
        assert!(matches!(issuer.decode("not.a.token", ACCESS), Err(JwtError::InvalidToken)));

        let mut other_config = AppConfig::development().security;
        other_config.jwt_secret = "another-secret".to_string();
        let foreign = TokenIssuer::new(&other_config).issue_access(1, "bob").unwrap();
        assert!(matches!(issuer.decode(&foreign, ACCESS), Err(JwtError::InvalidToken)));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let mut config = AppConfig::development().security;
        config.access_token_minutes = -5;
        let issuer = TokenIssuer::new(&config);
        let token = issuer.issue_access(1, "carol").unwrap();
        assert!(issuer.decode(&token, ACCESS).is_err());
    }

    #[test]
    fn empty_secret_cannot_issue() {
        let mut config = AppConfig::development().security;
        config.jwt_secret.clear();
        assert!(matches!(TokenIssuer::new(&config).issue_access(1, "x"), Err(JwtError::InvalidSecret)));
    }
}
