//! Book endpoints: CRUD, `available`, `by_author` and the lending actions.

use super::{body_to_map, parse_id};
use crate::error::AppError;
use crate::extractors::{AuthUser, MaybeAuthUser};
use crate::models::{BookOut, LendingAction};
use crate::response::{success_many, success_one, success_one_ok};
use crate::service::{BookService, WriteMode};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::Value;
use std::collections::HashMap;

#[utoipa::path(
    get,
    path = "/api/v1/books/",
    tag = "books",
    params(
        ("status" = Option<String>, Query, description = "available | borrowed | maintenance | retired"),
        ("category" = Option<i64>, Query, description = "Category id"),
        ("author" = Option<i64>, Query, description = "Author id"),
        ("search" = Option<String>, Query, description = "Terms matched against title, description and author name"),
        ("ordering" = Option<String>, Query, description = "created_at, publication_date, title, price; prefix - for descending"),
        ("limit" = Option<u32>, Query, description = "Page size, max 1000; all rows when absent"),
        ("offset" = Option<u32>, Query, description = "Rows to skip")
    ),
    responses((status = 200, description = "Books matching the filters"))
)]
pub async fn list_books(
    _user: MaybeAuthUser,
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let books = BookService::list(&state.pool, &params).await?;
    Ok(success_many(books.into_iter().map(BookOut::from).collect()))
}

#[utoipa::path(
    post,
    path = "/api/v1/books/",
    tag = "books",
    responses(
        (status = 201, description = "Book created"),
        (status = 400, description = "Field errors"),
        (status = 401, description = "Authentication required")
    ),
    security(("token" = []))
)]
pub async fn create_book(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let body = body_to_map(body)?;
    let book = BookService::create(&state.pool, &body).await?;
    tracing::debug!(user = %user.username, book_id = book.id, "create book");
    Ok(success_one(BookOut::from(book)))
}

#[utoipa::path(
    get,
    path = "/api/v1/books/{id}/",
    tag = "books",
    params(("id" = i64, Path, description = "Book id")),
    responses((status = 200, description = "Book"), (status = 404, description = "No such book"))
)]
pub async fn read_book(
    _user: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id, "book")?;
    let book = BookService::read(&state.pool, id).await?;
    Ok(success_one_ok(BookOut::from(book)))
}

#[utoipa::path(
    put,
    path = "/api/v1/books/{id}/",
    tag = "books",
    params(("id" = i64, Path, description = "Book id")),
    responses((status = 200, description = "Book replaced"), (status = 400, description = "Field errors")),
    security(("token" = []))
)]
pub async fn update_book(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id, "book")?;
    let body = body_to_map(body)?;
    let book = BookService::update(&state.pool, id, &body, WriteMode::Update).await?;
    Ok(success_one_ok(BookOut::from(book)))
}

#[utoipa::path(
    patch,
    path = "/api/v1/books/{id}/",
    tag = "books",
    params(("id" = i64, Path, description = "Book id")),
    responses((status = 200, description = "Book updated"), (status = 400, description = "Field errors")),
    security(("token" = []))
)]
pub async fn partial_update_book(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id, "book")?;
    let body = body_to_map(body)?;
    let book = BookService::update(&state.pool, id, &body, WriteMode::PartialUpdate).await?;
    Ok(success_one_ok(BookOut::from(book)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/books/{id}/",
    tag = "books",
    params(("id" = i64, Path, description = "Book id")),
    responses((status = 204, description = "Book deleted"), (status = 409, description = "Book is borrowed")),
    security(("token" = []))
)]
pub async fn delete_book(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&id, "book")?;
    BookService::delete(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/books/available/",
    tag = "books",
    responses((status = 200, description = "Books with status available"))
)]
pub async fn available_books(
    _user: MaybeAuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let books = BookService::available(&state.pool).await?;
    Ok(success_many(books.into_iter().map(BookOut::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/v1/books/by_author/",
    tag = "books",
    params(("author_id" = i64, Query, description = "Author id")),
    responses((status = 200, description = "Books by the author"), (status = 400, description = "author_id missing or invalid"))
)]
pub async fn books_by_author(
    _user: MaybeAuthUser,
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let books = BookService::by_author(&state.pool, &params).await?;
    Ok(success_many(books.into_iter().map(BookOut::from).collect()))
}

async fn transition(state: AppState, id: String, action: LendingAction) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id, "book")?;
    let book = BookService::transition(&state.pool, id, action).await?;
    Ok(success_one_ok(BookOut::from(book)))
}

#[utoipa::path(
    patch,
    path = "/api/v1/books/{id}/mark_as_borrowed/",
    tag = "books",
    params(("id" = i64, Path, description = "Book id")),
    responses((status = 200, description = "Book borrowed"), (status = 409, description = "Book is not available")),
    security(("token" = []))
)]
pub async fn mark_as_borrowed(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    transition(state, id, LendingAction::Borrow).await
}

#[utoipa::path(
    patch,
    path = "/api/v1/books/{id}/mark_as_returned/",
    tag = "books",
    params(("id" = i64, Path, description = "Book id")),
    responses((status = 200, description = "Book returned"), (status = 409, description = "Book is not borrowed")),
    security(("token" = []))
)]
pub async fn mark_as_returned(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    transition(state, id, LendingAction::Return).await
}
