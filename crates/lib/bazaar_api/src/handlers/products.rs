//! Product handlers.

use axum::extract::State;
use axum::http::StatusCode;
use bazaar_core::dto::{CreateProductRequest, ListQuery, ProductResponse, UpdateProductRequest};
use uuid::Uuid;

use crate::AppState;
use crate::error::AppResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::auth::RequestContext;
use crate::response::{ApiResponse, created, ok};

/// `GET /products/title/{title}`
pub async fn get_by_title(
    State(state): State<AppState>,
    ApiPath(title): ApiPath<String>,
) -> AppResult<ApiResponse<ProductResponse>> {
    Ok(ok(state.products.get_by_title(&title).await?))
}

/// `GET /categories/{category_id}/products`
pub async fn list(
    State(state): State<AppState>,
    ApiPath(category_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> AppResult<ApiResponse<Vec<ProductResponse>>> {
    Ok(ok(state.products.list(category_id, query).await?))
}

/// `POST /categories/{category_id}/products`
pub async fn create(
    State(state): State<AppState>,
    ctx: RequestContext,
    ApiPath(category_id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<CreateProductRequest>,
) -> AppResult<ApiResponse<ProductResponse>> {
    Ok(created(
        state.products.create(ctx.user_id, category_id, body).await?,
    ))
}

/// `PUT /products/{product_id}`
pub async fn update(
    State(state): State<AppState>,
    ctx: RequestContext,
    ApiPath(product_id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<UpdateProductRequest>,
) -> AppResult<ApiResponse<ProductResponse>> {
    Ok(ok(state.products.update(ctx.user_id, product_id, body).await?))
}

/// `DELETE /products/{product_id}`
pub async fn delete(
    State(state): State<AppState>,
    ctx: RequestContext,
    ApiPath(product_id): ApiPath<Uuid>,
) -> AppResult<StatusCode> {
    state.products.delete(ctx.user_id, product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
