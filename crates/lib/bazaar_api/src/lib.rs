//! # bazaar_api
//!
//! HTTP API library for Bazaar.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod response;

use std::sync::Arc;

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{MethodRouter, delete, get, post, put};
use bazaar_core::auth::{AuthService, PasswordHasher, SessionManager};
use bazaar_core::catalog::{CategoryService, ImageService, ProductService};
use bazaar_core::models::Role;
use bazaar_core::store::{
    CategoryRepository, IdentityRepository, ImageRepository, PgCategoryRepository,
    PgIdentityRepository, PgImageRepository, PgProductRepository, PgTokenStore,
    ProductRepository, TokenStore,
};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::handlers::{auth, categories, health, images, products};
use crate::middleware::auth::{require_auth, require_role};

/// Storage handles the services are built on.
#[derive(Clone)]
pub struct Repositories {
    pub tokens: Arc<dyn TokenStore>,
    pub identities: Arc<dyn IdentityRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub categories: Arc<dyn CategoryRepository>,
    pub images: Arc<dyn ImageRepository>,
}

impl Repositories {
    /// PostgreSQL repositories sharing one pool.
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            tokens: Arc::new(PgTokenStore::new(pool.clone())),
            identities: Arc::new(PgIdentityRepository::new(pool.clone())),
            products: Arc::new(PgProductRepository::new(pool.clone())),
            categories: Arc::new(PgCategoryRepository::new(pool.clone())),
            images: Arc::new(PgImageRepository::new(pool)),
        }
    }

    /// Every handle backed by the same store.
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: TokenStore
            + IdentityRepository
            + ProductRepository
            + CategoryRepository
            + ImageRepository
            + 'static,
    {
        Self {
            tokens: store.clone(),
            identities: store.clone(),
            products: store.clone(),
            categories: store.clone(),
            images: store,
        }
    }
}

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub products: Arc<ProductService>,
    pub categories: Arc<CategoryService>,
    pub images: Arc<ImageService>,
}

impl AppState {
    pub fn new(config: &AppConfig, repos: Repositories) -> Self {
        let sessions = Arc::new(SessionManager::new(
            config.jwt.secret_key.as_bytes(),
            chrono::Duration::seconds(config.jwt.access_ttl_secs),
            chrono::Duration::days(config.jwt.refresh_ttl_days),
            repos.tokens,
        ));
        let hasher = PasswordHasher::new(config.auth.bcrypt_cost);
        Self {
            auth: Arc::new(AuthService::new(repos.identities, sessions, hasher)),
            products: Arc::new(ProductService::new(repos.products.clone())),
            categories: Arc::new(CategoryService::new(repos.categories)),
            images: Arc::new(ImageService::new(repos.images, repos.products)),
        }
    }
}

/// Run embedded database migrations.
///
/// Delegates to `bazaar_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    bazaar_core::migrate::migrate(pool).await
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Any authenticated caller.
    let authed = {
        let state = state.clone();
        move |route: MethodRouter<AppState>| {
            route.route_layer(from_fn_with_state(state.clone(), require_auth))
        }
    };
    // Authenticated sellers only. The outer auth layer runs first.
    let seller = {
        let state = state.clone();
        move |route: MethodRouter<AppState>| {
            route
                .route_layer(from_fn_with_state(Role::Seller, require_role))
                .route_layer(from_fn_with_state(state.clone(), require_auth))
        }
    };

    Router::new()
        .route("/healthz", get(health::healthz))
        // Accounts
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route(
            "/auth/update-auth",
            authed(put(auth::update_credentials)),
        )
        .route("/auth/update-profile", authed(put(auth::update_profile)))
        .route("/auth/profile", authed(get(auth::profile)))
        .route("/auth/delete", authed(delete(auth::delete_user)))
        // Categories
        .route(
            "/categories",
            get(categories::list).merge(seller(post(categories::create))),
        )
        .route(
            "/categories/{category_id}",
            get(categories::get)
                .merge(seller(put(categories::update).delete(categories::delete))),
        )
        // Products
        .route(
            "/categories/{category_id}/products",
            authed(get(products::list)).merge(seller(post(products::create))),
        )
        .route(
            "/products/title/{title}",
            authed(get(products::get_by_title)),
        )
        .route(
            "/products/{product_id}",
            seller(put(products::update).delete(products::delete)),
        )
        // Images
        .route(
            "/products/{product_id}/images",
            get(images::list).merge(seller(post(images::create))),
        )
        .route(
            "/images/{image_id}",
            get(images::get).merge(seller(delete(images::delete))),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
