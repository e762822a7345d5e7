//! Authentication: password hashing, session tokens, and the account
//! lifecycle built on them.

pub mod password;
pub mod service;
pub mod session;

use thiserror::Error;

use crate::store::StoreError;

pub use password::PasswordHasher;
pub use service::AuthService;
pub use session::{SessionError, SessionManager};

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("unsupported user_type: {0}")]
    UnsupportedRole(String),

    #[error("username or email already registered")]
    DuplicateIdentity,

    #[error("uniqueness check failed: {0}")]
    UniquenessCheckFailed(StoreError),

    #[error("provide either username or email, not both")]
    AmbiguousIdentifier,

    #[error("username or email is required")]
    MissingIdentifier,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid token: {0}")]
    InvalidToken(SessionError),

    #[error("profile payload does not match user_type {0}")]
    PayloadTypeMismatch(crate::models::Role),

    #[error("identity not found")]
    IdentityNotFound,

    #[error("password hashing failed: {0}")]
    Hashing(#[from] bcrypt::BcryptError),

    #[error("token generation failed: {0}")]
    TokenGeneration(SessionError),

    #[error("repository error: {0}")]
    Repository(StoreError),
}

impl AuthError {
    /// Stable machine code.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::Validation(_) => "VALIDATION",
            AuthError::UnsupportedRole(_) => "INVALID_TYPE",
            AuthError::DuplicateIdentity => "DUPLICATE",
            AuthError::UniquenessCheckFailed(_) | AuthError::Repository(_) => "REPOSITORY",
            AuthError::AmbiguousIdentifier | AuthError::MissingIdentifier => "INPUT",
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::InvalidToken(_) => "INVALID_TOKEN",
            AuthError::PayloadTypeMismatch(_) => "INVALID_PAYLOAD",
            AuthError::IdentityNotFound => "NOT_FOUND",
            AuthError::Hashing(_) => "HASHING",
            AuthError::TokenGeneration(_) => "TOKEN_GENERATION",
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(_) => AuthError::DuplicateIdentity,
            other => AuthError::Repository(other),
        }
    }
}

impl From<SessionError> for AuthError {
    /// Issuing failures are generation errors; everything else means the
    /// presented token was not acceptable.
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::Signing(_) | SessionError::TokenPersistence(_) => {
                AuthError::TokenGeneration(e)
            }
            SessionError::Store(s) => AuthError::Repository(s),
            other => AuthError::InvalidToken(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflicts_surface_as_duplicates() {
        let err = AuthError::from(StoreError::Conflict("users_user_type_email_key".into()));
        assert!(matches!(err, AuthError::DuplicateIdentity));
        assert_eq!(err.code(), "DUPLICATE");
    }

    #[test]
    fn session_errors_split_by_kind() {
        assert_eq!(
            AuthError::from(SessionError::RefreshTokenRevoked).code(),
            "INVALID_TOKEN"
        );
        assert_eq!(
            AuthError::from(SessionError::TokenPersistence(StoreError::NotFound)).code(),
            "TOKEN_GENERATION"
        );
    }
}
