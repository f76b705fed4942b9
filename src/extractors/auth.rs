//! Token authentication from the `Authorization` header (`Token <key>` or `Bearer <key>`).

use crate::error::AppError;
use crate::models::User;
use crate::service::AuthService;
use crate::state::AppState;
use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

const SCHEMES: [&str; 2] = ["token", "bearer"];

/// Key carried by an `Authorization` value. `Ok(None)` for an absent header or another
/// scheme; `Err` for a recognized scheme with a malformed credential.
pub fn parse_authorization(value: &str) -> Result<Option<&str>, &'static str> {
    let mut parts = value.split_whitespace();
    let Some(scheme) = parts.next() else {
        return Ok(None);
    };
    if !SCHEMES.iter().any(|s| scheme.eq_ignore_ascii_case(s)) {
        return Ok(None);
    }
    let key = parts
        .next()
        .ok_or("Invalid token header. No credentials provided.")?;
    if parts.next().is_some() {
        return Err("Invalid token header. Token string should not contain spaces.");
    }
    Ok(Some(key))
}

/// Resolves the request's principal. A present but invalid token is always rejected.
async fn principal(parts: &Parts, state: &AppState) -> Result<Option<User>, AppError> {
    let Some(raw) = parts.headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let raw = raw
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid token header. Token string should not contain invalid characters.".into()))?;
    let Some(key) = parse_authorization(raw).map_err(|msg| AppError::Unauthorized(msg.into()))? else {
        return Ok(None);
    };
    match AuthService::user_for_token(&state.pool, key).await? {
        Some(user) => Ok(Some(user)),
        None => {
            tracing::warn!("request with unknown token");
            Err(AppError::Unauthorized("Invalid token.".into()))
        }
    }
}

/// Authenticated principal; rejects with 401 when credentials are absent.
#[derive(Clone, Debug)]
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match principal(parts, state).await? {
            Some(user) => Ok(AuthUser(user)),
            None => Err(AppError::Unauthorized(
                "Authentication credentials were not provided.".into(),
            )),
        }
    }
}

/// Principal if credentials were sent; anonymous otherwise.
#[derive(Clone, Debug)]
pub struct MaybeAuthUser(pub Option<User>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuthUser(principal(parts, state).await?))
    }
}
