//! Author endpoints. Deleting an author also deletes their books.

use super::{body_to_map, parse_id};
use crate::error::AppError;
use crate::extractors::{AuthUser, MaybeAuthUser};
use crate::response::{success_many, success_one, success_one_ok};
use crate::service::{AuthorService, WriteMode};
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
    path = "/api/v1/authors/",
    tag = "authors",
    params(
        ("search" = Option<String>, Query, description = "Terms matched against first_name, last_name, email"),
        ("ordering" = Option<String>, Query, description = "last_name, first_name, created_at; prefix - for descending"),
        ("limit" = Option<u32>, Query, description = "Page size, max 1000; all rows when absent"),
        ("offset" = Option<u32>, Query, description = "Rows to skip")
    ),
    responses((status = 200, description = "Author list"))
)]
pub async fn list_authors(
    _user: MaybeAuthUser,
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_many(AuthorService::list(&state.pool, &params).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/authors/",
    tag = "authors",
    responses(
        (status = 201, description = "Author created"),
        (status = 400, description = "Field errors"),
        (status = 401, description = "Authentication required")
    ),
    security(("token" = []))
)]
pub async fn create_author(
    _user: AuthUser,
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let body = body_to_map(body)?;
    Ok(success_one(AuthorService::create(&state.pool, &body).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/authors/{id}/",
    tag = "authors",
    params(("id" = i64, Path, description = "Author id")),
    responses((status = 200, description = "Author"), (status = 404, description = "No such author"))
)]
pub async fn read_author(
    _user: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id, "author")?;
    Ok(success_one_ok(AuthorService::read(&state.pool, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/authors/{id}/",
    tag = "authors",
    params(("id" = i64, Path, description = "Author id")),
    responses((status = 200, description = "Author replaced"), (status = 400, description = "Field errors")),
    security(("token" = []))
)]
pub async fn update_author(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id, "author")?;
    let body = body_to_map(body)?;
    Ok(success_one_ok(AuthorService::update(&state.pool, id, &body, WriteMode::Update).await?))
}

#[utoipa::path(
    patch,
    path = "/api/v1/authors/{id}/",
    tag = "authors",
    params(("id" = i64, Path, description = "Author id")),
    responses((status = 200, description = "Author updated"), (status = 400, description = "Field errors")),
    security(("token" = []))
)]
pub async fn partial_update_author(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id, "author")?;
    let body = body_to_map(body)?;
    Ok(success_one_ok(AuthorService::update(&state.pool, id, &body, WriteMode::PartialUpdate).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/authors/{id}/",
    tag = "authors",
    params(("id" = i64, Path, description = "Author id")),
    responses((status = 204, description = "Author and their books deleted")),
    security(("token" = []))
)]
pub async fn delete_author(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&id, "author")?;
    AuthorService::delete(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
