use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use tracing::{debug, instrument};

use super::types::{LinkClaims, SessionClaims};
use crate::config::AppConfig;
use crate::shared::AppError;

/// Account-link tokens only need to survive one round trip to the provider
const LINK_TOKEN_MINUTES: i64 = 10;

/// Configuration for JWT token operations
#[derive(Clone)]
pub struct TokenConfig {
    secret: String,
    pub expiration_days: i64,
}

impl TokenConfig {
    pub fn new(secret: impl Into<String>, expiration_days: i64) -> Self {
        Self {
            secret: secret.into(),
            expiration_days,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.jwt_secret.clone(), config.session_expiration_days)
    }

    /// Creates a new session JWT for the given session row
    #[instrument(skip(self, session_id, user_id))]
    pub fn create_token(&self, session_id: String, user_id: String) -> Result<String, AppError> {
        let now = Utc::now();
        let exp = (now + Duration::days(self.expiration_days)).timestamp() as usize;

        debug!(
            expiration_days = self.expiration_days,
            exp_timestamp = exp,
            "Creating session token"
        );

        let claims = SessionClaims {
            session_id,
            user_id,
            exp,
            iat: now.timestamp() as usize,
        };
        self.encode(&claims)
    }

    /// Validates a session JWT and returns the claims if valid
    #[instrument(skip(self, token))]
    pub fn validate_token(&self, token: &str) -> Result<SessionClaims, AppError> {
        let claims: SessionClaims = self.decode(token)?;
        debug!(
            user_id = %claims.user_id,
            session_id = %claims.session_id,
            exp = claims.exp,
            "Session token decoded successfully"
        );
        Ok(claims)
    }

    /// Creates the token stored in the `oauth_link` cookie
    pub fn create_link_token(&self, user_id: &str, provider: &str) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = LinkClaims {
            user_id: user_id.to_string(),
            provider: provider.to_string(),
            exp: (now + Duration::minutes(LINK_TOKEN_MINUTES)).timestamp() as usize,
            iat: now.timestamp() as usize,
        };
        self.encode(&claims)
    }

    pub fn validate_link_token(&self, token: &str) -> Result<LinkClaims, AppError> {
        self.decode(token)
    }

    fn encode<T: serde::Serialize>(&self, claims: &T) -> Result<String, AppError> {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(self.secret.as_ref()),
        )
        .map_err(|e| {
            debug!(error = %e, "Failed to encode JWT token");
            AppError::JwtError(e.to_string())
        })
    }

    fn decode<T: serde::de::DeserializeOwned>(&self, token: &str) -> Result<T, AppError> {
        decode::<T>(
            token,
            &DecodingKey::from_secret(self.secret.as_ref()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| {
            debug!(error = %e, "Failed to decode JWT token");
            AppError::JwtError(e.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_validate_token() {
        let config = TokenConfig::new("secret", 30);

        let token = config
            .create_token("session-1".to_string(), "user-1".to_string())
            .unwrap();
        assert!(!token.is_empty());

        let claims = config.validate_token(&token).unwrap();
        assert_eq!(claims.session_id, "session-1");
        assert_eq!(claims.user_id, "user-1");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_invalid_token() {
        let config = TokenConfig::new("secret", 30);
        let result = config.validate_token("invalid.token.here");
        assert!(matches!(result, Err(AppError::JwtError(_))));
    }

    #[test]
    fn test_token_with_different_secret() {
        let config1 = TokenConfig::new("secret-one", 30);
        let config2 = TokenConfig::new("secret-two", 30);

        let token = config1
            .create_token("session".to_string(), "user".to_string())
            .unwrap();

        assert!(config1.validate_token(&token).is_ok());
        assert!(config2.validate_token(&token).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let config = TokenConfig::new("secret", -1);
        let token = config
            .create_token("session".to_string(), "user".to_string())
            .unwrap();
        assert!(config.validate_token(&token).is_err());
    }

    #[test]
    fn test_link_token_round_trip() {
        let config = TokenConfig::new("secret", 30);
        let token = config.create_link_token("user-1", "google").unwrap();
        let claims = config.validate_link_token(&token).unwrap();
        assert_eq!(claims.user_id, "user-1");
        assert_eq!(claims.provider, "google");
    }

    #[test]
    fn test_session_token_is_not_a_link_token() {
        let config = TokenConfig::new("secret", 30);
        let token = config
            .create_token("session".to_string(), "user".to_string())
            .unwrap();
        assert!(config.validate_link_token(&token).is_err());
    }
}
