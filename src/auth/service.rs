use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use tracing::{debug, instrument};

use super::models::{AccessClaims, Principal};
use crate::shared::CoreError;

/// The auth collaborator contract: token in, authenticated principal out.
///
/// Invoked exactly once per connection, at accept time. Everything after the
/// handshake works with the returned `Principal` and never sees credentials.
#[async_trait]
pub trait AuthService: Send + Sync {
    async fn authenticate(&self, token: &str) -> Result<Principal, CoreError>;
}

/// Configuration for JWT token operations
#[derive(Clone)]
pub struct TokenConfig {
    secret: String,
    pub expiration_hours: i64,
}

impl TokenConfig {
    pub fn new() -> Self {
        let expiration_hours = std::env::var("TOKEN_EXPIRATION_HOURS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(24);

        Self {
            secret: std::env::var("JWT_SECRET")
                .unwrap_or_else(|_| "your-secret-key-change-in-production".to_string()),
            expiration_hours,
        }
    }

    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            expiration_hours: 24,
        }
    }

    /// Creates a new access token for the given principal
    #[instrument(skip(self, principal))]
    pub fn create_token(&self, principal: &Principal) -> Result<String, CoreError> {
        let now = Utc::now();
        let exp = (now + Duration::hours(self.expiration_hours)).timestamp() as usize;

        let claims = AccessClaims {
            sub: principal.id.clone(),
            name: principal.display_name.clone(),
            avatar: principal.avatar_url.clone(),
            exp,
            iat: now.timestamp() as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_ref()),
        )
        .map_err(|e| {
            debug!(error = %e, "Failed to encode access token");
            CoreError::AuthenticationFailure(e.to_string())
        })
    }

    /// Validates an access token and returns the claims if valid
    #[instrument(skip(self, token))]
    pub fn validate_token(&self, token: &str) -> Result<AccessClaims, CoreError> {
        decode::<AccessClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_ref()),
            &Validation::default(),
        )
        .map(|data| {
            debug!(
                principal_id = %data.claims.sub,
                exp = data.claims.exp,
                "Access token validated"
            );
            data.claims
        })
        .map_err(|e| {
            debug!(error = %e, "Failed to decode access token");
            CoreError::AuthenticationFailure(e.to_string())
        })
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// JWT-backed implementation of the auth collaborator
pub struct JwtAuthService {
    config: TokenConfig,
}

impl JwtAuthService {
    pub fn new(config: TokenConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl AuthService for JwtAuthService {
    async fn authenticate(&self, token: &str) -> Result<Principal, CoreError> {
        let claims = self.config.validate_token(token)?;
        Ok(claims.into_principal())
    }
}
