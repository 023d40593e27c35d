use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use tracing::{debug, instrument};

use super::types::AuthClaims;
use crate::room::models::Role;
use crate::shared::AppError;

/// Configuration for JWT token operations
#[derive(Clone)]
pub struct TokenConfig {
    secret: String,
    pub expiration_days: i64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenConfig {
    pub fn new() -> Self {
        // Allow configuring expiration via env var, default to 365 days (1 year)
        let expiration_days = std::env::var("SESSION_EXPIRATION_DAYS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(365);

        Self {
            secret: std::env::var("JWT_SECRET")
                .unwrap_or_else(|_| "your-secret-key-change-in-production".to_string()),
            expiration_days,
        }
    }

    /// Creates a new JWT token for the given identity.
    ///
    /// Token issuance belongs to the account service; this helper exists for
    /// that service and for tests.
    #[instrument(skip(self, email, username))]
    pub fn create_token(
        &self,
        email: String,
        username: String,
        role: Role,
    ) -> Result<String, AppError> {
        let now = Utc::now();
        let exp = (now + Duration::days(self.expiration_days)).timestamp() as usize;

        debug!(
            expiration_days = self.expiration_days,
            exp_timestamp = exp,
            "Creating JWT token with expiration"
        );

        let claims = AuthClaims {
            email,
            username,
            role,
            exp,
            iat: now.timestamp() as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_ref()),
        )
        .map_err(|e| {
            debug!(error = %e, "Failed to encode JWT token");
            AppError::JwtError(e.to_string())
        })
    }

    /// Validates a JWT token and returns the verified claims
    #[instrument(skip(self, token))]
    pub fn validate_token(&self, token: &str) -> Result<AuthClaims, AppError> {
        debug!("Decoding and validating JWT token");

        decode::<AuthClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_ref()),
            &Validation::default(),
        )
        .map(|data| {
            debug!(
                email = %data.claims.email,
                role = %data.claims.role,
                exp = data.claims.exp,
                "JWT token decoded successfully"
            );
            data.claims
        })
        .map_err(|e| {
            debug!(error = %e, "Failed to decode JWT token");
            AppError::Unauthorized("Invalid or expired token".to_string())
        })
    }
}
