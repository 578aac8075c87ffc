//! Authentication and authorization ports.

use uuid::Uuid;

/// What a token is allowed to be used for. Session tokens resume a login;
/// reset tokens authorize exactly one password change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPurpose {
    Session,
    PasswordReset,
}

/// Claims carried by an issued token.
#[derive(Debug, Clone)]
pub struct TokenClaims {
    pub user_id: Uuid,
    pub email: String,
    pub roles: Vec<String>,
    pub purpose: TokenPurpose,
    pub exp: i64,
}

/// Token service trait for session and password-reset tokens.
pub trait TokenService: Send + Sync {
    /// Issue a session token for a user.
    fn issue_session(
        &self,
        user_id: Uuid,
        email: &str,
        roles: Vec<String>,
    ) -> Result<String, AuthError>;

    /// Issue a short-lived password-reset token.
    fn issue_reset(&self, user_id: Uuid, email: &str) -> Result<String, AuthError>;

    /// Validate and decode a token, checking it was issued for `purpose`.
    fn validate(&self, token: &str, purpose: TokenPurpose) -> Result<TokenClaims, AuthError>;

    /// Session lifetime in seconds, for `expires_in` responses.
    fn session_seconds(&self) -> i64;
}

/// Password hashing service.
pub trait PasswordService: Send + Sync {
    /// Hash a plain text password.
    fn hash(&self, password: &str) -> Result<String, AuthError>;

    /// Verify a password against a hash.
    fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError>;
}

/// Authentication errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token not valid for this operation")]
    WrongPurpose,

    #[error("Missing authorization header")]
    MissingAuth,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Hashing error: {0}")]
    HashingError(String),
}
