//! Product image handlers.

use axum::extract::State;
use axum::http::StatusCode;
use bazaar_core::dto::{CreateImageRequest, ImageResponse, ListQuery};
use uuid::Uuid;

use crate::AppState;
use crate::error::AppResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::auth::RequestContext;
use crate::response::{ApiResponse, created, ok};

/// `GET /products/{product_id}/images`
pub async fn list(
    State(state): State<AppState>,
    ApiPath(product_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> AppResult<ApiResponse<Vec<ImageResponse>>> {
    Ok(ok(state.images.list_by_product(product_id, query).await?))
}

/// `GET /images/{image_id}`
pub async fn get(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<ImageResponse>> {
    Ok(ok(state.images.get(id).await?))
}

/// `POST /products/{product_id}/images`
pub async fn create(
    State(state): State<AppState>,
    ctx: RequestContext,
    ApiPath(product_id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<CreateImageRequest>,
) -> AppResult<ApiResponse<ImageResponse>> {
    Ok(created(
        state.images.create(ctx.user_id, product_id, body).await?,
    ))
}

/// `DELETE /images/{image_id}`
pub async fn delete(
    State(state): State<AppState>,
    ctx: RequestContext,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<StatusCode> {
    state.images.delete(ctx.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
