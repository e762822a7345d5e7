//! Account and session handlers.

use axum::extract::State;
use axum::http::StatusCode;
use bazaar_core::dto::{
    LoginRequest, ProfileResponse, ProfileUpdate, RegisterRequest, TokenPair,
    UpdateCredentialsRequest,
};

use crate::AppState;
use crate::error::AppResult;
use crate::extract::ApiJson;
use crate::middleware::auth::RequestContext;
use crate::response::{ApiResponse, created, ok};

/// `POST /auth/register`
pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> AppResult<ApiResponse<TokenPair>> {
    Ok(created(state.auth.register(body).await?))
}

/// `POST /auth/login` with exactly one of `username` or `email`.
pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> AppResult<ApiResponse<TokenPair>> {
    Ok(ok(state.auth.login(body).await?))
}

/// `PUT /auth/update-auth`: the session ends on success.
pub async fn update_credentials(
    State(state): State<AppState>,
    ctx: RequestContext,
    ApiJson(body): ApiJson<UpdateCredentialsRequest>,
) -> AppResult<StatusCode> {
    state.auth.update_credentials(ctx.user_id, body).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `PUT /auth/update-profile`
pub async fn update_profile(
    State(state): State<AppState>,
    ctx: RequestContext,
    ApiJson(body): ApiJson<ProfileUpdate>,
) -> AppResult<StatusCode> {
    state.auth.update_profile(ctx.user_id, ctx.role, body).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /auth/profile`
pub async fn profile(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> AppResult<ApiResponse<ProfileResponse>> {
    Ok(ok(state.auth.profile(ctx.user_id).await?))
}

/// `DELETE /auth/delete`
pub async fn delete_user(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> AppResult<StatusCode> {
    state.auth.delete_user(ctx.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
