//! Author and category endpoints: uniqueness, derived counts, delete semantics.

mod common;

use axum::http::StatusCode;
use common::*;
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = false)]
async fn author_serializes_full_name_and_books_count(pool: PgPool) {
    let app = app(pool).await;
    let token = token(&app).await;
    let author = create_author(&app, &token, "Jane", "Smith", "a@x.com").await;
    create_book(&app, &token, book_payload("1234567890123", "Test Book", author, None)).await;

    let reply = get(&app, &format!("/api/v1/authors/{}/", author)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["data"]["full_name"], "Jane Smith");
    assert_eq!(reply.body["data"]["books_count"], 1);
    assert!(reply.body["data"]["birth_date"].is_null());
}

#[sqlx::test(migrations = false)]
async fn author_email_must_be_unique_and_valid(pool: PgPool) {
    let app = app(pool).await;
    let token = token(&app).await;
    create_author(&app, &token, "Jane", "Smith", "a@x.com").await;
    let other = create_author(&app, &token, "John", "Doe", "b@x.com").await;

    let reply = post(
        &app,
        "/api/v1/authors/",
        &token,
        json!({ "first_name": "Ann", "last_name": "Lee", "email": "a@x.com" }),
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        reply.body["error"]["details"]["email"][0],
        "An author with this email already exists."
    );

    let reply = patch(&app, &format!("/api/v1/authors/{}/", other), &token, json!({ "email": "a@x.com" })).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    // Keeping one's own email is not a collision.
    let reply = patch(
        &app,
        &format!("/api/v1/authors/{}/", other),
        &token,
        json!({ "email": "b@x.com", "birth_date": "1970-05-01" }),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    assert_eq!(reply.body["data"]["birth_date"], "1970-05-01");

    let reply = post(
        &app,
        "/api/v1/authors/",
        &token,
        json!({ "first_name": "Ann", "last_name": "Lee", "email": "nope" }),
    )
    .await;
    assert_eq!(reply.body["error"]["details"]["email"][0], "Enter a valid email address.");
}

#[sqlx::test(migrations = false)]
async fn authors_default_to_last_then_first_name(pool: PgPool) {
    let app = app(pool).await;
    let token = token(&app).await;
    create_author(&app, &token, "Zoe", "Adams", "z@x.com").await;
    create_author(&app, &token, "Amy", "Brown", "amy@x.com").await;
    create_author(&app, &token, "Al", "Adams", "al@x.com").await;

    let reply = get(&app, "/api/v1/authors/").await;
    let names: Vec<&str> = reply.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["full_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Al Adams", "Zoe Adams", "Amy Brown"]);

    let reply = get(&app, "/api/v1/authors/?search=brown").await;
    assert_eq!(reply.body["meta"]["count"], 1);
}

#[sqlx::test(migrations = false)]
async fn deleting_an_author_deletes_their_books(pool: PgPool) {
    let app = app(pool.clone()).await;
    let token = token(&app).await;
    let author = create_author(&app, &token, "Jane", "Smith", "a@x.com").await;
    let book = create_book(&app, &token, book_payload("1234567890123", "Test Book", author, None)).await;

    let reply = delete(&app, &format!("/api/v1/authors/{}/", author), &token).await;
    assert_eq!(reply.status, StatusCode::NO_CONTENT);
    assert_eq!(get(&app, &format!("/api/v1/books/{}/", book["id"])).await.status, StatusCode::NOT_FOUND);
    assert_eq!(delete(&app, &format!("/api/v1/authors/{}/", author), &token).await.status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = false)]
async fn category_name_must_be_unique(pool: PgPool) {
    let app = app(pool).await;
    let token = token(&app).await;
    create_category(&app, &token, "Fiction").await;

    let reply = post(&app, "/api/v1/categories/", &token, json!({ "name": "Fiction" })).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        reply.body["error"]["details"]["name"][0],
        "category with this name already exists."
    );
}

#[sqlx::test(migrations = false)]
async fn deleting_a_category_detaches_its_books(pool: PgPool) {
    let app = app(pool).await;
    let token = token(&app).await;
    let author = create_author(&app, &token, "Jane", "Smith", "a@x.com").await;
    let category = create_category(&app, &token, "Fiction").await;
    let book = create_book(&app, &token, book_payload("1234567890123", "Test Book", author, Some(category))).await;

    let reply = get(&app, &format!("/api/v1/categories/{}/", category)).await;
    assert_eq!(reply.body["data"]["books_count"], 1);
    assert_eq!(reply.body["data"]["description"], "");

    let reply = delete(&app, &format!("/api/v1/categories/{}/", category), &token).await;
    assert_eq!(reply.status, StatusCode::NO_CONTENT);

    let reply = get(&app, &format!("/api/v1/books/{}/", book["id"])).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body["data"]["category"].is_null());
    assert!(reply.body["data"]["category_name"].is_null());
}

#[sqlx::test(migrations = false)]
async fn categories_list_by_name(pool: PgPool) {
    let app = app(pool).await;
    let token = token(&app).await;
    create_category(&app, &token, "Science").await;
    create_category(&app, &token, "Art").await;

    let reply = get(&app, "/api/v1/categories/").await;
    assert_eq!(reply.body["meta"]["count"], 2);
    assert_eq!(reply.body["data"][0]["name"], "Art");

    let reply = put(&app, "/api/v1/categories/999/", &token, json!({ "name": "Gone" })).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}
