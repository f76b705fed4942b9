//! Registration and token exchange.

use super::body_to_map;
use crate::error::AppError;
use crate::models::UserOut;
use crate::response::success_one;
use crate::service::AuthService;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct Registered {
    pub user: UserOut,
    pub token: String,
}

#[derive(Serialize, ToSchema)]
pub struct TokenBody {
    pub token: String,
}

#[utoipa::path(
    post,
    path = "/api/v1/register/",
    tag = "auth",
    responses((status = 201, description = "User created with a token"), (status = 400, description = "Field errors"))
)]
pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let body = body_to_map(body)?;
    let (user, token) = AuthService::register(&state.pool, &body).await?;
    Ok(success_one(Registered {
        user: UserOut::from(&user),
        token,
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/token/",
    tag = "auth",
    responses(
        (status = 200, description = "Token for the credentials", body = TokenBody),
        (status = 400, description = "Unable to log in with provided credentials")
    )
)]
pub async fn obtain_token(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<TokenBody>, AppError> {
    let body = body_to_map(body)?;
    let token = AuthService::obtain_token(&state.pool, &body).await?;
    Ok(Json(TokenBody { token }))
}
