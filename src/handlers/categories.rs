//! Category endpoints.

use super::{body_to_map, parse_id};
use crate::error::AppError;
use crate::extractors::{AuthUser, MaybeAuthUser};
use crate::response::{success_many, success_one, success_one_ok};
use crate::service::{CategoryService, WriteMode};
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
    path = "/api/v1/categories/",
    tag = "categories",
    params(
        ("search" = Option<String>, Query, description = "Terms matched against name, description"),
        ("ordering" = Option<String>, Query, description = "name, created_at; prefix - for descending"),
        ("limit" = Option<u32>, Query, description = "Page size, max 1000; all rows when absent"),
        ("offset" = Option<u32>, Query, description = "Rows to skip")
    ),
    responses((status = 200, description = "Category list"))
)]
pub async fn list_categories(
    _user: MaybeAuthUser,
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_many(CategoryService::list(&state.pool, &params).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/categories/",
    tag = "categories",
    responses(
        (status = 201, description = "Category created"),
        (status = 400, description = "Field errors"),
        (status = 401, description = "Authentication required")
    ),
    security(("token" = []))
)]
pub async fn create_category(
    _user: AuthUser,
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let body = body_to_map(body)?;
    Ok(success_one(CategoryService::create(&state.pool, &body).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/categories/{id}/",
    tag = "categories",
    params(("id" = i64, Path, description = "Category id")),
    responses((status = 200, description = "Category"), (status = 404, description = "No such category"))
)]
pub async fn read_category(
    _user: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id, "category")?;
    Ok(success_one_ok(CategoryService::read(&state.pool, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/categories/{id}/",
    tag = "categories",
    params(("id" = i64, Path, description = "Category id")),
    responses((status = 200, description = "Category replaced"), (status = 400, description = "Field errors")),
    security(("token" = []))
)]
pub async fn update_category(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id, "category")?;
    let body = body_to_map(body)?;
    Ok(success_one_ok(CategoryService::update(&state.pool, id, &body, WriteMode::Update).await?))
}

#[utoipa::path(
    patch,
    path = "/api/v1/categories/{id}/",
    tag = "categories",
    params(("id" = i64, Path, description = "Category id")),
    responses((status = 200, description = "Category updated"), (status = 400, description = "Field errors")),
    security(("token" = []))
)]
pub async fn partial_update_category(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id, "category")?;
    let body = body_to_map(body)?;
    Ok(success_one_ok(CategoryService::update(&state.pool, id, &body, WriteMode::PartialUpdate).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/categories/{id}/",
    tag = "categories",
    params(("id" = i64, Path, description = "Category id")),
    responses((status = 204, description = "Category deleted, its books keep no category")),
    security(("token" = []))
)]
pub async fn delete_category(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&id, "category")?;
    CategoryService::delete(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
