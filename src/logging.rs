//! Tracing subscriber set-up for binaries embedding the API.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "bookstore_api=info,tower_http=info";

/// Install a fmt subscriber filtered by `RUST_LOG` (falls back to [`DEFAULT_LOG_FILTER`]).
/// A second call is a no-op.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
