//! Router assembly.

mod api;
mod common;

pub use api::{api_routes, API_PREFIX};
pub use common::common_routes;

use crate::middleware::interceptors;
use crate::state::AppState;
use axum::Router;
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

/// Every route with the interceptor chain, trailing slashes trimmed before routing.
/// Serve with `axum::ServiceExt::<axum::extract::Request>::into_make_service`.
pub fn build_app(state: AppState) -> NormalizePath<Router> {
    let router = Router::new()
        .merge(common_routes())
        .nest(API_PREFIX, api_routes())
        .with_state(state.clone());
    NormalizePathLayer::trim_trailing_slash().layer(interceptors(router, state))
}
