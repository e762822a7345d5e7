//! Authentication middleware: bearer token verification and role checks.

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use bazaar_core::models::Role;
use tracing::debug;
use uuid::Uuid;

use crate::AppState;
use crate::error::AppError;

/// The authenticated caller, inserted into request extensions by
/// [`require_auth`] and extracted by handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    pub user_id: Uuid,
    pub role: Role,
}

impl<S: Send + Sync> FromRequestParts<S> for RequestContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .copied()
            .ok_or_else(|| AppError::Unauthorized("authentication required".into()))
    }
}

/// Axum middleware: extracts `Authorization: Bearer <token>`, verifies the
/// access token, and injects a [`RequestContext`].
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("missing authorization header".into()))?;

    let token = header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthorized("invalid authorization scheme".into()))?;

    let claims = state.auth.sessions().verify_access_token(token).map_err(|e| {
        debug!(error = %e, "access token rejected");
        AppError::from(e)
    })?;

    request.extensions_mut().insert(RequestContext {
        user_id: claims.user_id,
        role: claims.role,
    });
    Ok(next.run(request).await)
}

/// Axum middleware: admits only callers of the role given as state. Must run
/// after [`require_auth`].
pub async fn require_role(
    State(role): State<Role>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ctx = request
        .extensions()
        .get::<RequestContext>()
        .copied()
        .ok_or_else(|| AppError::Unauthorized("authentication required".into()))?;
    if ctx.role != role {
        debug!(user_id = %ctx.user_id, have = %ctx.role, need = %role, "role check failed");
        return Err(AppError::Forbidden(format!("{role} role required")));
    }
    Ok(next.run(request).await)
}
