//! Request extractors: token principal and negotiated API version.

pub mod auth;
pub mod version;

pub use auth::{AuthUser, MaybeAuthUser};
pub use version::ApiVersion;
