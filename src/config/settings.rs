//! Server settings read from the environment (after loading `.env` if present).

use crate::error::ConfigError;
use std::net::SocketAddr;
use std::str::FromStr;

pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost/bookstore";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_API_VERSION: &str = "1.0";

#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub db_max_connections: u32,
    /// Max accepted request body size.
    pub body_limit_bytes: usize,
    /// Stamped on every response as `X-API-Version`.
    pub api_version: String,
    /// `max-age` for cacheable GET responses under `/api/`.
    pub cache_max_age_secs: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            database_url: DEFAULT_DATABASE_URL.into(),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            db_max_connections: 5,
            body_limit_bytes: 1024 * 1024,
            api_version: DEFAULT_API_VERSION.into(),
            cache_max_age_secs: 300,
        }
    }
}

impl Settings {
    /// Load `.env` (ignored when missing) and read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup. Unset keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Settings::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Ok(Settings {
            database_url: get("DATABASE_URL").unwrap_or(defaults.database_url),
            bind_addr: parse_or("BIND_ADDR", get("BIND_ADDR"), defaults.bind_addr)?,
            db_max_connections: parse_or(
                "DB_MAX_CONNECTIONS",
                get("DB_MAX_CONNECTIONS"),
                defaults.db_max_connections,
            )?,
            body_limit_bytes: parse_or("BODY_LIMIT_BYTES", get("BODY_LIMIT_BYTES"), defaults.body_limit_bytes)?,
            api_version: get("API_VERSION").unwrap_or(defaults.api_version),
            cache_max_age_secs: parse_or(
                "CACHE_MAX_AGE_SECS",
                get("CACHE_MAX_AGE_SECS"),
                defaults.cache_max_age_secs,
            )?,
        })
    }
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.parse::<T>().map_err(|e| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
    }
}
