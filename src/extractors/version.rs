//! API version requested by the client (`API-Version` header).

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};

pub const API_VERSION_HEADER: &str = "API-Version";
pub const DEFAULT_API_VERSION: &str = "1.0";

/// Requested API version. Inserted as a request extension by the interceptor chain;
/// read from the header directly when the chain is not installed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiVersion(pub String);

impl ApiVersion {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let value = headers
            .get(API_VERSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_API_VERSION.to_string());
        ApiVersion(value)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ApiVersion
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(version) = parts.extensions.get::<ApiVersion>() {
            return Ok(version.clone());
        }
        Ok(ApiVersion::from_headers(&parts.headers))
    }
}
