//! JWT token service implementation.
//!
//! Issues two kinds of tokens: session tokens that resume a login, and
//! short-lived password-reset tokens mailed to the user. The purpose is a
//! claim, so a reset token can never be replayed as a session.

use chrono::{TimeDelta, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cbu_core::ports::{AuthError, TokenClaims, TokenPurpose, TokenService};

const PURPOSE_SESSION: &str = "session";
const PURPOSE_RESET: &str = "password-reset";

/// JWT token service configuration.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub session_hours: i64,
    pub reset_minutes: i64,
    pub issuer: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: "change-me-in-production".to_string(),
            session_hours: 24,
            reset_minutes: 60,
            issuer: "cbu-api".to_string(),
        }
    }
}

/// Internal JWT claims structure for serialization.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String, // user_id
    email: String,
    roles: Vec<String>,
    purpose: String,
    exp: i64,    // expiration timestamp
    iat: i64,    // issued at
    iss: String, // issuer
}

/// JWT-based token service.
pub struct JwtTokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    config: JwtConfig,
}

impl JwtTokenService {
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            encoding_key,
            decoding_key,
            config,
        }
    }

    fn issue(
        &self,
        user_id: Uuid,
        email: &str,
        roles: Vec<String>,
        purpose: &str,
        lifetime: TimeDelta,
    ) -> Result<String, AuthError> {
        let now = Utc::now();

        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            roles,
            purpose: purpose.to_string(),
            exp: (now + lifetime).timestamp(),
            iat: now.timestamp(),
            iss: self.config.issuer.clone(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }
}

impl TokenService for JwtTokenService {
    fn issue_session(
        &self,
        user_id: Uuid,
        email: &str,
        roles: Vec<String>,
    ) -> Result<String, AuthError> {
        self.issue(
            user_id,
            email,
            roles,
            PURPOSE_SESSION,
            TimeDelta::hours(self.config.session_hours),
        )
    }

    fn issue_reset(&self, user_id: Uuid, email: &str) -> Result<String, AuthError> {
        self.issue(
            user_id,
            email,
            Vec::new(),
            PURPOSE_RESET,
            TimeDelta::minutes(self.config.reset_minutes),
        )
    }

    fn validate(&self, token: &str, purpose: TokenPurpose) -> Result<TokenClaims, AuthError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.config.issuer]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken(e.to_string()),
            }
        })?;

        let claims = token_data.claims;

        let decoded_purpose = match claims.purpose.as_str() {
            PURPOSE_SESSION => TokenPurpose::Session,
            PURPOSE_RESET => TokenPurpose::PasswordReset,
            other => return Err(AuthError::InvalidToken(format!("unknown purpose {other}"))),
        };
        if decoded_purpose != purpose {
            return Err(AuthError::WrongPurpose);
        }

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        Ok(TokenClaims {
            user_id,
            email: claims.email,
            roles: claims.roles,
            purpose: decoded_purpose,
            exp: claims.exp,
        })
    }

    fn session_seconds(&self) -> i64 {
        self.config.session_hours * 3600
    }
}
