//! Resource services: validation, store checks and query execution for each endpoint.

mod auth;
mod authors;
mod books;
mod categories;
pub mod validation;

pub use auth::AuthService;
pub use authors::AuthorService;
pub use books::BookService;
pub use categories::CategoryService;
pub use validation::{Payload, WriteMode};

use crate::error::{AppError, FieldErrors};
use crate::sql::{PgBindValue, QueryBuf};
use crate::store::{AUTHORS_EMAIL_KEY, BOOKS_ISBN_KEY, CATEGORIES_NAME_KEY, USERS_USERNAME_KEY};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgExecutor};

pub(crate) async fn fetch_all<'e, E, T>(executor: E, q: &QueryBuf) -> Result<Vec<T>, AppError>
where
    E: PgExecutor<'e>,
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let mut query = sqlx::query_as::<_, T>(&q.sql);
    for p in &q.params {
        query = query.bind(p.clone());
    }
    Ok(query.fetch_all(executor).await?)
}

pub(crate) async fn fetch_optional<'e, E, T>(executor: E, q: &QueryBuf) -> Result<Option<T>, AppError>
where
    E: PgExecutor<'e>,
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let mut query = sqlx::query_as::<_, T>(&q.sql);
    for p in &q.params {
        query = query.bind(p.clone());
    }
    Ok(query.fetch_optional(executor).await?)
}

/// Run an INSERT … RETURNING id.
pub(crate) async fn insert_returning_id<'e, E>(executor: E, q: &QueryBuf) -> Result<i64, AppError>
where
    E: PgExecutor<'e>,
{
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let mut query = sqlx::query_scalar::<_, i64>(&q.sql);
    for p in &q.params {
        query = query.bind(p.clone());
    }
    query.fetch_one(executor).await.map_err(unique_violation)
}

/// Run a statement; returns rows affected.
pub(crate) async fn execute<'e, E>(executor: E, q: &QueryBuf) -> Result<u64, AppError>
where
    E: PgExecutor<'e>,
{
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let mut query = sqlx::query(&q.sql);
    for p in &q.params {
        query = query.bind(p.clone());
    }
    let result = query.execute(executor).await.map_err(unique_violation)?;
    Ok(result.rows_affected())
}

/// Whether `sql` (a single `SELECT EXISTS(...)`) holds for the bound values.
pub(crate) async fn exists<'e, E>(executor: E, sql: &str, params: Vec<PgBindValue>) -> Result<bool, AppError>
where
    E: PgExecutor<'e>,
{
    tracing::debug!(sql = %sql, params = ?params, "query");
    let mut query = sqlx::query_scalar::<_, bool>(sql);
    for p in params {
        query = query.bind(p);
    }
    Ok(query.fetch_one(executor).await?)
}

/// Field and message for a unique constraint, by constraint name.
fn unique_field(constraint: &str) -> Option<(&'static str, &'static str)> {
    match constraint {
        BOOKS_ISBN_KEY => Some(("isbn", validation::MSG_ISBN_TAKEN)),
        AUTHORS_EMAIL_KEY => Some(("email", validation::MSG_EMAIL_TAKEN)),
        CATEGORIES_NAME_KEY => Some(("name", validation::MSG_CATEGORY_TAKEN)),
        USERS_USERNAME_KEY => Some(("username", validation::MSG_USERNAME_TAKEN)),
        _ => None,
    }
}

/// Unique violations that slip past the pre-checks (concurrent writers) become field errors.
pub(crate) fn unique_violation(err: sqlx::Error) -> AppError {
    if let Some(db) = err.as_database_error() {
        if db.is_unique_violation() {
            if let Some((field, message)) = db.constraint().and_then(unique_field) {
                tracing::debug!(field, "unique violation mapped to field error");
                return AppError::Validation(FieldErrors::single(field, message));
            }
        }
    }
    AppError::Db(err)
}
