//! Catalog and auth table DDL, applied idempotently at start-up.

use crate::error::{AppError, ConfigError};
use sqlx::ConnectOptions;
use sqlx::PgPool;
use std::str::FromStr;

/// Unique constraint names. Store-level violations are mapped back to fields by these names.
pub const BOOKS_ISBN_KEY: &str = "books_isbn_key";
pub const AUTHORS_EMAIL_KEY: &str = "authors_email_key";
pub const CATEGORIES_NAME_KEY: &str = "categories_name_key";
pub const USERS_USERNAME_KEY: &str = "users_username_key";

/// Tables in dependency order.
const TABLE_DDL: &[(&str, &str)] = &[
    (
        "authors",
        r#"
        CREATE TABLE IF NOT EXISTS authors (
            id BIGSERIAL PRIMARY KEY,
            first_name VARCHAR(100) NOT NULL,
            last_name VARCHAR(100) NOT NULL,
            email VARCHAR(254) NOT NULL,
            birth_date DATE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            CONSTRAINT authors_email_key UNIQUE (email)
        )
        "#,
    ),
    (
        "categories",
        r#"
        CREATE TABLE IF NOT EXISTS categories (
            id BIGSERIAL PRIMARY KEY,
            name VARCHAR(100) NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            CONSTRAINT categories_name_key UNIQUE (name)
        )
        "#,
    ),
    (
        "books",
        r#"
        CREATE TABLE IF NOT EXISTS books (
            id BIGSERIAL PRIMARY KEY,
            title VARCHAR(200) NOT NULL,
            isbn VARCHAR(13) NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            publication_date DATE NOT NULL,
            pages INTEGER NOT NULL,
            price NUMERIC(10, 2) NOT NULL,
            status VARCHAR(20) NOT NULL DEFAULT 'available',
            author_id BIGINT NOT NULL REFERENCES authors (id) ON DELETE CASCADE,
            category_id BIGINT REFERENCES categories (id) ON DELETE SET NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            CONSTRAINT books_isbn_key UNIQUE (isbn),
            CONSTRAINT books_pages_positive CHECK (pages > 0),
            CONSTRAINT books_price_non_negative CHECK (price >= 0),
            CONSTRAINT books_status_choice CHECK (status IN ('available', 'borrowed', 'maintenance', 'retired'))
        )
        "#,
    ),
    (
        "users",
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id BIGSERIAL PRIMARY KEY,
            username VARCHAR(150) NOT NULL,
            email VARCHAR(254) NOT NULL DEFAULT '',
            password_hash TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            CONSTRAINT users_username_key UNIQUE (username)
        )
        "#,
    ),
    (
        "auth_tokens",
        r#"
        CREATE TABLE IF NOT EXISTS auth_tokens (
            key VARCHAR(64) PRIMARY KEY,
            user_id BIGINT NOT NULL UNIQUE REFERENCES users (id) ON DELETE CASCADE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
];

const INDEX_DDL: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS books_title_idx ON books (title)",
    "CREATE INDEX IF NOT EXISTS books_status_idx ON books (status)",
    "CREATE INDEX IF NOT EXISTS books_author_id_idx ON books (author_id)",
    "CREATE INDEX IF NOT EXISTS books_category_id_idx ON books (category_id)",
    "CREATE INDEX IF NOT EXISTS books_created_at_idx ON books (created_at DESC)",
];

/// Create every table and index if missing. Safe to call on each start.
pub async fn ensure_tables(pool: &PgPool) -> Result<(), AppError> {
    for (table, ddl) in TABLE_DDL {
        tracing::debug!(table = %table, "ensure table");
        sqlx::query(ddl).execute(pool).await?;
    }
    for ddl in INDEX_DDL {
        sqlx::query(ddl).execute(pool).await?;
    }
    Ok(())
}

/// Ensure the database in `database_url` exists; create it if not. Connects to the
/// default `postgres` database to run CREATE DATABASE. Call before creating the main pool.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)
        .map_err(|e| invalid_url(e.to_string()))?;
    let mut conn: sqlx::PgConnection = opts.connect().await.map_err(AppError::Db)?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await
        .map_err(AppError::Db)?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        let quoted = quote_ident(&db_name);
        sqlx::query(&format!("CREATE DATABASE {}", quoted))
            .execute(&mut conn)
            .await
            .map_err(AppError::Db)?;
    }
    Ok(())
}

/// The URL may carry credentials, so it is never echoed back.
fn invalid_url(reason: impl Into<String>) -> AppError {
    AppError::Config(ConfigError::Invalid {
        key: "DATABASE_URL",
        value: "<redacted>".into(),
        reason: reason.into(),
    })
}

fn parse_db_name_from_url(url: &str) -> Result<(String, String), AppError> {
    let path_start = url.rfind('/').ok_or_else(|| invalid_url("no database path"))? + 1;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let db_name = path_and_query.split('?').next().unwrap_or("").trim();
    let base = url.get(..path_start).unwrap_or(url);
    let admin_url = format!("{}postgres", base);
    Ok((admin_url, db_name.to_string()))
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_database_name_from_url() {
        let (admin, name) = parse_db_name_from_url("postgres://user:pw@localhost:5432/bookstore?sslmode=disable").unwrap();
        assert_eq!(admin, "postgres://user:pw@localhost:5432/postgres");
        assert_eq!(name, "bookstore");
    }

    #[test]
    fn url_without_path_is_a_config_error() {
        let err = parse_db_name_from_url("not-a-url").unwrap_err();
        assert!(matches!(
            err,
            AppError::Config(ConfigError::Invalid { key: "DATABASE_URL", .. })
        ));
        assert!(!err.to_string().contains("not-a-url"));
    }

    #[test]
    fn quotes_identifiers() {
        assert_eq!(quote_ident("book\"store"), "\"book\"\"store\"");
    }

    #[test]
    fn unique_constraints_are_declared_by_name() {
        let all: String = TABLE_DDL.iter().map(|(_, ddl)| *ddl).collect();
        for key in [BOOKS_ISBN_KEY, AUTHORS_EMAIL_KEY, CATEGORIES_NAME_KEY, USERS_USERNAME_KEY] {
            assert!(all.contains(key), "{} missing from DDL", key);
        }
    }
}
