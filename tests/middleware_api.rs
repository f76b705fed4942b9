//! Interceptor chain headers and operational routes.

mod common;

use axum::http::{Method, StatusCode};
use common::*;
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = false)]
async fn api_responses_carry_version_timing_and_cache_headers(pool: PgPool) {
    let app = app(pool).await;

    let reply = get(&app, "/api/v1/books/").await;
    assert_eq!(reply.headers["x-api-version"], "1.0");
    assert!(reply.headers["x-processing-time"].to_str().unwrap().ends_with('s'));
    assert_eq!(reply.headers["cache-control"], "public, max-age=300");

    let reply = send(&app, Method::POST, "/api/v1/token/", None, Some(json!({}))).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.headers["cache-control"], "no-cache, no-store, must-revalidate");
}

#[sqlx::test(migrations = false)]
async fn operational_routes(pool: PgPool) {
    let app = app(pool).await;

    let reply = get(&app, "/health").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["status"], "ok");
    assert!(reply.headers.get("cache-control").is_none());

    let reply = get(&app, "/ready").await;
    assert_eq!(reply.body["database"], "ok");

    let reply = get(&app, "/version").await;
    assert_eq!(reply.body["name"], "bookstore-api");
    assert_eq!(reply.body["requested_api_version"], "1.0");

    let reply = get(&app, "/openapi.json").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body["paths"].get("/api/v1/books/").is_some());
}

#[sqlx::test(migrations = false)]
async fn malformed_json_is_a_bad_request(pool: PgPool) {
    let app = app(pool).await;
    let token = token(&app).await;
    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/api/v1/categories/")
        .header("authorization", format!("Token {}", token))
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();
    let response = tower::ServiceExt::oneshot(app.clone(), request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = false)]
async fn version_echoes_the_requested_api_version(pool: PgPool) {
    let app = app(pool).await;
    let request = axum::http::Request::builder()
        .uri("/version")
        .header("API-Version", "2.1")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(app.clone(), request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-api-version"], "1.0");
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["requested_api_version"], "2.1");
    assert_eq!(body["api_version"], "1.0");
}
