//! Access and refresh tokens.

use appraisal_common::config::AuthConfig;
use appraisal_common::{AppError, AppResult};
use appraisal_db::entities::user::{self, UserRole};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::policy::Actor;

/// Access token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub role: String,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

/// A freshly generated refresh token.
#[derive(Debug, Clone)]
pub struct RefreshToken {
    /// Handed to the client, never stored.
    pub token: String,
    /// What the database keeps.
    pub hash: String,
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies access tokens; mints refresh tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    access_lifetime: Duration,
    refresh_lifetime: Duration,
}

impl TokenService {
    /// Create a token service from the auth configuration.
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            access_lifetime: Duration::minutes(config.access_token_minutes),
            refresh_lifetime: Duration::days(config.refresh_token_days),
        }
    }

    /// Access token lifetime in seconds.
    #[must_use]
    pub fn access_lifetime_secs(&self) -> i64 {
        self.access_lifetime.num_seconds()
    }

    /// Sign an access token for a user.
    pub fn issue_access_token(&self, user: &user::Model) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            role: user.role.as_str().to_string(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now.timestamp(),
            exp: (now + self.access_lifetime).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {e}")))
    }

    /// Verify an access token and recover the caller.
    pub fn verify(&self, token: &str) -> AppResult<Actor> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            debug!(error = %e, "Rejected access token");
            AppError::Unauthorized
        })?;

        let id = data
            .claims
            .sub
            .parse::<i32>()
            .map_err(|_| AppError::Unauthorized)?;
        let role = UserRole::parse(&data.claims.role).ok_or(AppError::Unauthorized)?;

        Ok(Actor::new(id, role))
    }

    /// Mint a refresh token.
    #[must_use]
    pub fn new_refresh_token(&self) -> RefreshToken {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = URL_SAFE_NO_PAD.encode(bytes);

        RefreshToken {
            hash: hash_refresh_token(&token),
            token,
            expires_at: Utc::now() + self.refresh_lifetime,
        }
    }
}

/// SHA-256 hex digest of a refresh token.
#[must_use]
pub fn hash_refresh_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Strip the `Bearer ` scheme from an `Authorization` header value.
#[must_use]
pub fn extract_bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
