//! Application error types.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bazaar_core::auth::{AuthError, SessionError};
use bazaar_core::catalog::CatalogError;
use thiserror::Error;
use tracing::error;

use crate::response::Envelope;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Input(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// The detail is logged, never sent.
    #[error("internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Input(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AppError::Internal(detail) => {
                error!(error = %detail, "request failed");
                "internal server error".to_string()
            }
            AppError::Input(m)
            | AppError::Validation(m)
            | AppError::Unauthorized(m)
            | AppError::Forbidden(m)
            | AppError::NotFound(m)
            | AppError::Conflict(m) => m,
        };
        (status, Json(Envelope::<()>::failure(message))).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        let message = e.to_string();
        match e {
            AuthError::Validation(m) => AppError::Validation(m),
            AuthError::UnsupportedRole(_) | AuthError::PayloadTypeMismatch(_) => {
                AppError::Validation(message)
            }
            AuthError::AmbiguousIdentifier | AuthError::MissingIdentifier => {
                AppError::Input(message)
            }
            AuthError::DuplicateIdentity => AppError::Conflict(message),
            AuthError::InvalidCredentials | AuthError::InvalidToken(_) => {
                AppError::Unauthorized(message)
            }
            AuthError::IdentityNotFound => AppError::NotFound(message),
            AuthError::UniquenessCheckFailed(_)
            | AuthError::Hashing(_)
            | AuthError::TokenGeneration(_)
            | AuthError::Repository(_) => AppError::Internal(format!("{}: {message}", e.code())),
        }
    }
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::Signing(_) | SessionError::TokenPersistence(_) | SessionError::Store(_) => {
                AppError::Internal(format!("{}: {e}", e.code()))
            }
            other => AppError::Unauthorized(other.to_string()),
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(e: CatalogError) -> Self {
        let message = e.to_string();
        match e {
            CatalogError::Input(_) => AppError::Input(message),
            CatalogError::Validation(m) => AppError::Validation(m),
            CatalogError::Duplicate(_) | CatalogError::InUse(_) => AppError::Conflict(message),
            CatalogError::NotFound(_) => AppError::NotFound(message),
            CatalogError::Forbidden(_) => AppError::Forbidden(message),
            CatalogError::Repository(_) => AppError::Internal(format!("{}: {message}", e.code())),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        AppError::Input(e.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(e: PathRejection) -> Self {
        AppError::Input(e.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(e: QueryRejection) -> Self {
        AppError::Input(e.body_text())
    }
}
