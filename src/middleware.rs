//! Interceptor chain applied to every route, outermost first:
//! tracing span, request logging with processing time, API-version handling,
//! cache-control headers for `/api/` paths, body size limit.

use crate::extractors::ApiVersion;
use crate::state::AppState;
use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state, Next},
    response::Response,
    Router,
};
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

pub const PROCESSING_TIME_HEADER: &str = "x-processing-time";
pub const API_VERSION_RESPONSE_HEADER: &str = "x-api-version";
pub const NO_STORE: &str = "no-cache, no-store, must-revalidate";

/// Wrap `router` in the full interceptor chain.
pub fn interceptors(router: Router, state: AppState) -> Router {
    let body_limit = state.settings.body_limit_bytes;
    router.layer(
        ServiceBuilder::new()
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                    .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
            )
            .layer(from_fn(log_requests))
            .layer(from_fn_with_state(state.clone(), api_version))
            .layer(from_fn_with_state(state, cache_control))
            .layer(DefaultBodyLimit::max(body_limit)),
    )
}

/// Logs each request and its completion; stamps `X-Processing-Time`.
pub async fn log_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let start = Instant::now();
    tracing::info!(%method, %path, "incoming request");

    let mut response = next.run(req).await;

    let elapsed = start.elapsed().as_secs_f64();
    let status = response.status();
    if status.is_server_error() {
        tracing::error!(%method, %path, status = status.as_u16(), elapsed_secs = elapsed, "request failed");
    } else {
        tracing::info!(%method, %path, status = status.as_u16(), elapsed_secs = elapsed, "request processed");
    }
    if let Ok(value) = HeaderValue::from_str(&format!("{:.3}s", elapsed)) {
        response.headers_mut().insert(PROCESSING_TIME_HEADER, value);
    }
    response
}

/// Makes the requested `API-Version` available to handlers; stamps the served version.
pub async fn api_version(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let requested = ApiVersion::from_headers(req.headers());
    tracing::debug!(api_version = %requested.0, "requested api version");
    req.extensions_mut().insert(requested);

    let mut response = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&state.settings.api_version) {
        response.headers_mut().insert(API_VERSION_RESPONSE_HEADER, value);
    }
    response
}

/// Cache-Control value for a request, or None outside `/api/`.
pub fn cache_policy(method: &Method, path: &str, max_age_secs: u32) -> Option<String> {
    if !path.starts_with("/api/") {
        return None;
    }
    if method == Method::GET {
        Some(format!("public, max-age={}", max_age_secs))
    } else {
        Some(NO_STORE.to_string())
    }
}

pub async fn cache_control(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let policy = cache_policy(req.method(), req.uri().path(), state.settings.cache_max_age_secs);
    let mut response = next.run(req).await;
    if let Some(value) = policy.and_then(|p| HeaderValue::from_str(&p).ok()) {
        response.headers_mut().insert(header::CACHE_CONTROL, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_policy_only_under_api() {
        assert_eq!(cache_policy(&Method::GET, "/health", 300), None);
        assert_eq!(
            cache_policy(&Method::GET, "/api/v1/books/", 300).as_deref(),
            Some("public, max-age=300")
        );
        for method in [Method::POST, Method::PUT, Method::PATCH, Method::DELETE] {
            assert_eq!(cache_policy(&method, "/api/v1/books/1/", 300).as_deref(), Some(NO_STORE));
        }
    }
}
