//! Shared helpers for the HTTP integration tests: app assembly, requests, fixtures.
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode},
    Router,
};
use bookstore_api::{build_app, ensure_tables, AppState, Settings};
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;
use tower_http::normalize_path::NormalizePath;

pub type App = NormalizePath<Router>;

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// App over a fresh test database with the tables created.
pub async fn app(pool: PgPool) -> App {
    ensure_tables(&pool).await.unwrap();
    build_app(AppState::new(pool, Settings::default()))
}

pub async fn send(app: &App, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Reply {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Token {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
    };
    Reply { status, headers, body }
}

pub async fn get(app: &App, uri: &str) -> Reply {
    send(app, Method::GET, uri, None, None).await
}

pub async fn post(app: &App, uri: &str, token: &str, body: Value) -> Reply {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn patch(app: &App, uri: &str, token: &str, body: Value) -> Reply {
    send(app, Method::PATCH, uri, Some(token), Some(body)).await
}

pub async fn put(app: &App, uri: &str, token: &str, body: Value) -> Reply {
    send(app, Method::PUT, uri, Some(token), Some(body)).await
}

pub async fn delete(app: &App, uri: &str, token: &str) -> Reply {
    send(app, Method::DELETE, uri, Some(token), None).await
}

/// Register a user and return their token.
pub async fn token(app: &App) -> String {
    let reply = send(
        app,
        Method::POST,
        "/api/v1/register/",
        None,
        Some(json!({ "username": "librarian", "password": "shelf-keeper-1" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
    reply.body["data"]["token"].as_str().unwrap().to_string()
}

pub async fn create_author(app: &App, token: &str, first: &str, last: &str, email: &str) -> i64 {
    let reply = post(
        app,
        "/api/v1/authors/",
        token,
        json!({ "first_name": first, "last_name": last, "email": email }),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
    reply.body["data"]["id"].as_i64().unwrap()
}

pub async fn create_category(app: &App, token: &str, name: &str) -> i64 {
    let reply = post(app, "/api/v1/categories/", token, json!({ "name": name })).await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
    reply.body["data"]["id"].as_i64().unwrap()
}

pub fn book_payload(isbn: &str, title: &str, author: i64, category: Option<i64>) -> Value {
    json!({
        "title": title,
        "isbn": isbn,
        "description": "A test book",
        "publication_date": "2023-01-01",
        "pages": 300,
        "price": "19.99",
        "author": author,
        "category": category
    })
}

pub async fn create_book(app: &App, token: &str, payload: Value) -> Value {
    let reply = post(app, "/api/v1/books/", token, payload).await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
    reply.body["data"].clone()
}
