//! Category handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bazaar_core::dto::{CategoryRequest, CategoryResponse, ListQuery};
use uuid::Uuid;

use crate::AppState;
use crate::error::AppResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::response::{ApiResponse, created, ok};

/// `GET /categories`
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> AppResult<ApiResponse<Vec<CategoryResponse>>> {
    Ok(ok(state.categories.list(query).await?))
}

/// `GET /categories/{category_id}`
pub async fn get(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<CategoryResponse>> {
    Ok(ok(state.categories.get(id).await?))
}

/// `POST /categories`
pub async fn create(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CategoryRequest>,
) -> AppResult<ApiResponse<CategoryResponse>> {
    Ok(created(state.categories.create(body).await?))
}

/// `PUT /categories/{category_id}`: 200 with the stored row, or 204 when no
/// category matched.
pub async fn update(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<CategoryRequest>,
) -> AppResult<Response> {
    Ok(match state.categories.update(id, body).await? {
        Some(category) => ok(category).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

/// `DELETE /categories/{category_id}`
pub async fn delete(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<StatusCode> {
    state.categories.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
