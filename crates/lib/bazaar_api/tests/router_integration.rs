//! Router-level tests against in-memory storage.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use bazaar_api::config::AppConfig;
use bazaar_api::{AppState, Repositories};
use bazaar_core::store::memory::MemoryStore;
use serde_json::{Value, json};
use tower::ServiceExt;

fn app() -> Router {
    let mut config = AppConfig::default();
    config.jwt.secret_key = "test-secret".into();
    config.auth.bcrypt_cost = 4;
    let store = Arc::new(MemoryStore::new());
    bazaar_api::router(AppState::new(&config, Repositories::shared(store)))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let req = match body {
        Some(body) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(req).await.expect("request");
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("parse JSON")
    };
    (status, json)
}

/// Register and return the access token.
async fn register(app: &Router, username: &str, email: &str, role: &str) -> String {
    register_pair(app, username, email, role).await.0
}

/// Register and return `(access_token, refresh_token)`.
async fn register_pair(app: &Router, username: &str, email: &str, role: &str) -> (String, String) {
    let (status, body) = send(
        app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({
            "username": username,
            "email": email,
            "password": "longenough",
            "user_type": role,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let token = |name: &str| body["data"][name].as_str().expect(name).to_string();
    (token("access_token"), token("refresh_token"))
}

/// Log in by username with `password`, returning the status.
async fn login(app: &Router, username: &str, role: &str, password: &str) -> StatusCode {
    send(
        app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "username": username, "password": password, "user_type": role })),
    )
    .await
    .0
}

/// Create a category and one product in it, returning their ids.
async fn seed_product(app: &Router, token: &str) -> (String, String) {
    let (status, body) = send(
        app,
        Method::POST,
        "/categories",
        Some(token),
        Some(json!({ "name": "Lighting" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let category_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        app,
        Method::POST,
        &format!("/categories/{category_id}/products"),
        Some(token),
        Some(json!({ "title": "Desk lamp", "price": 19.5 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let product_id = body["data"]["id"].as_str().unwrap().to_string();
    (category_id, product_id)
}

#[tokio::test]
async fn healthz_reports_alive() {
    let (status, body) = send(&app(), Method::GET, "/healthz", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "alive" }));
}

#[tokio::test]
async fn register_then_duplicate_email() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({
            "username": "alice123",
            "email": "a@x.com",
            "password": "longenough",
            "user_type": "customer",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert!(body["data"]["access_token"].is_string());
    assert!(body["data"]["refresh_token"].is_string());

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({
            "username": "alice456",
            "email": "a@x.com",
            "password": "longenough",
            "user_type": "customer",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn login_with_both_identifiers_is_rejected() {
    let app = app();
    register(&app, "alice123", "a@x.com", "customer").await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({
            "username": "alice123",
            "email": "a@x.com",
            "password": "longenough",
            "user_type": "customer",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized() {
    let app = app();
    register(&app, "alice123", "a@x.com", "customer").await;
    let (status, _) = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({
            "email": "a@x.com",
            "password": "not-the-one",
            "user_type": "customer",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_json_uses_the_envelope() {
    let app = app();
    let req = Request::builder()
        .method(Method::POST)
        .uri("/auth/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn protected_routes_need_a_bearer_token() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/auth/profile", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = send(&app, Method::GET, "/auth/profile", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn customers_cannot_use_seller_routes() {
    let app = app();
    let token = register(&app, "alice123", "a@x.com", "customer").await;
    let (status, _) = send(
        &app,
        Method::POST,
        "/categories",
        Some(&token),
        Some(json!({ "name": "Lighting" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn profile_update_and_read() {
    let app = app();
    let token = register(&app, "alice123", "a@x.com", "customer").await;

    let (status, _) = send(
        &app,
        Method::PUT,
        "/auth/update-profile",
        Some(&token),
        Some(json!({ "user_type": "seller", "company_name": "Acme" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::PUT,
        "/auth/update-profile",
        Some(&token),
        Some(json!({
            "user_type": "customer",
            "first_name": "Alice",
            "date_birth": "1990-04-01",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, Method::GET, "/auth/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["first_name"], "Alice");
    assert_eq!(body["data"]["date_birth"], "1990-04-01");
    assert_eq!(body["data"]["user_type"], "customer");
}

#[tokio::test]
async fn seller_manages_catalog() {
    let app = app();
    let token = register(&app, "acme_inc", "s@x.com", "seller").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/categories",
        Some(&token),
        Some(json!({ "name": "Lighting" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let category_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/categories/{category_id}/products"),
        Some(&token),
        Some(json!({ "title": "Desk lamp", "description": "bright", "price": 19.5 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let product_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        Method::GET,
        "/products/title/Desk%20lamp",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], product_id.as_str());

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/categories/{category_id}/products?limit=500&offset=-5"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/products/{product_id}"),
        Some(&token),
        Some(json!({ "title": "Desk lamp XL", "price": 25.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Desk lamp XL");

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/products/{product_id}/images"),
        Some(&token),
        Some(json!({ "url": "https://cdn.example.com/lamp.png" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let image_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/products/{product_id}/images"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["id"], image_id.as_str());

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/products/{product_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::GET, &format!("/images/{image_id}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn another_seller_cannot_update_product() {
    let app = app();
    let owner = register(&app, "acme_inc", "s@x.com", "seller").await;
    let rival = register(&app, "globex", "g@x.com", "seller").await;
    let (_, product_id) = seed_product(&app, &owner).await;

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/products/{product_id}"),
        Some(&rival),
        Some(json!({ "title": "Stolen lamp", "price": 1.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn product_reads_need_a_bearer_token() {
    let app = app();
    let owner = register(&app, "acme_inc", "s@x.com", "seller").await;
    let (category_id, _) = seed_product(&app, &owner).await;

    let (status, body) = send(&app, Method::GET, "/products/title/Desk%20lamp", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/categories/{category_id}/products"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let customer = register(&app, "alice123", "a@x.com", "customer").await;
    let (status, body) = send(
        &app,
        Method::GET,
        "/products/title/Desk%20lamp",
        Some(&customer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Desk lamp");
}

#[tokio::test]
async fn category_with_products_cannot_be_deleted() {
    let app = app();
    let owner = register(&app, "acme_inc", "s@x.com", "seller").await;
    let rival = register(&app, "globex", "g@x.com", "seller").await;
    let (category_id, product_id) = seed_product(&app, &owner).await;

    let (status, body) = send(
        &app,
        Method::DELETE,
        &format!("/categories/{category_id}"),
        Some(&rival),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);

    let (status, _) = send(
        &app,
        Method::GET,
        "/products/title/Desk%20lamp",
        Some(&owner),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/products/{product_id}"),
        Some(&owner),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/categories/{category_id}"),
        Some(&owner),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn renaming_missing_category_is_no_content() {
    let app = app();
    let token = register(&app, "acme_inc", "s@x.com", "seller").await;
    let (status, body) = send(
        &app,
        Method::PUT,
        "/categories/00000000-0000-0000-0000-000000000000",
        Some(&token),
        Some(json!({ "name": "Ghost" })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn update_auth_changes_password_and_ends_session() {
    let app = app();
    let (access, refresh) = register_pair(&app, "alice123", "a@x.com", "customer").await;
    let (_, other_refresh) = register_pair(&app, "bob4567", "b@x.com", "customer").await;

    let (status, _) = send(
        &app,
        Method::PUT,
        "/auth/update-auth",
        Some(&access),
        Some(json!({
            "refresh_token": other_refresh,
            "old_password": "longenough",
            "new_password": "evenlonger1",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        Method::PUT,
        "/auth/update-auth",
        Some(&access),
        Some(json!({
            "refresh_token": refresh,
            "old_password": "longenough",
            "new_password": "evenlonger1",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    // The refresh token was revoked by the update.
    let (status, _) = send(
        &app,
        Method::PUT,
        "/auth/update-auth",
        Some(&access),
        Some(json!({ "refresh_token": refresh, "email": "new@x.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert_eq!(
        login(&app, "alice123", "customer", "longenough").await,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        login(&app, "alice123", "customer", "evenlonger1").await,
        StatusCode::OK
    );
}

#[tokio::test]
async fn invalid_path_id_is_bad_request() {
    let (status, body) = send(&app(), Method::GET, "/categories/not-a-uuid", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn deleted_account_cannot_log_in() {
    let app = app();
    let token = register(&app, "alice123", "a@x.com", "customer").await;

    let (status, _) = send(&app, Method::DELETE, "/auth/delete", Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    assert_eq!(
        login(&app, "alice123", "customer", "longenough").await,
        StatusCode::UNAUTHORIZED
    );
}
