//! Authors: list/search and CRUD. Deleting an author removes their books.

use super::validation::{validate_author, AuthorChanges, Payload, WriteMode, MSG_EMAIL_TAKEN};
use super::{execute, exists, fetch_all, fetch_optional, insert_returning_id};
use crate::error::{AppError, FieldErrors};
use crate::models::Author;
use crate::sql::{delete, insert, select_by_id, select_list, update, ListSpec, OrderingSpec, PgBindValue};
use sqlx::{PgConnection, PgPool};
use std::collections::HashMap;

pub(crate) static AUTHOR_LIST: ListSpec = ListSpec {
    select: "SELECT a.id, a.first_name, a.last_name, a.email, a.birth_date, a.created_at, a.updated_at, \
             (a.first_name || ' ' || a.last_name) AS full_name, \
             (SELECT COUNT(*) FROM books b WHERE b.author_id = a.id) AS books_count \
             FROM authors a",
    filters: &[],
    search_columns: &["a.first_name", "a.last_name", "a.email"],
    ordering: &[
        OrderingSpec { key: "last_name", column: "a.last_name" },
        OrderingSpec { key: "first_name", column: "a.first_name" },
        OrderingSpec { key: "created_at", column: "a.created_at" },
    ],
    default_ordering: &["last_name", "first_name"],
    tiebreaker: "a.id",
};

#[derive(Debug, sqlx::FromRow)]
struct LockedAuthor {
    id: i64,
    email: String,
}

pub struct AuthorService;

impl AuthorService {
    pub async fn list(pool: &PgPool, params: &HashMap<String, String>) -> Result<Vec<Author>, AppError> {
        let query = AUTHOR_LIST.parse_params(params)?;
        fetch_all(pool, &select_list(&AUTHOR_LIST, &query)).await
    }

    pub async fn read(pool: &PgPool, id: i64) -> Result<Author, AppError> {
        fetch_optional(pool, &select_by_id(&AUTHOR_LIST, "a.id", id))
            .await?
            .ok_or_else(|| not_found(id))
    }

    pub async fn create(pool: &PgPool, body: &Payload) -> Result<Author, AppError> {
        let (changes, mut errors) = validate_author(body, WriteMode::Create);
        let mut tx = pool.begin().await?;
        errors.merge(check_email(&mut tx, &changes, None).await?);
        errors.into_result()?;

        let id = insert_returning_id(&mut *tx, &insert("authors", columns(changes))).await?;
        let author = reload(&mut tx, id).await?;
        tx.commit().await?;
        tracing::info!(author_id = id, "author created");
        Ok(author)
    }

    pub async fn update(pool: &PgPool, id: i64, body: &Payload, mode: WriteMode) -> Result<Author, AppError> {
        let mut tx = pool.begin().await?;
        let current = lock(&mut tx, id).await?;
        let (changes, mut errors) = validate_author(body, mode);
        errors.merge(check_email(&mut tx, &changes, Some(&current)).await?);
        errors.into_result()?;

        if let Some(q) = update("authors", current.id, columns(changes), true) {
            execute(&mut *tx, &q).await?;
        }
        let author = reload(&mut tx, id).await?;
        tx.commit().await?;
        Ok(author)
    }

    /// Cascades to the author's books, whatever their status.
    pub async fn delete(pool: &PgPool, id: i64) -> Result<(), AppError> {
        let affected = execute(pool, &delete("authors", id)).await?;
        if affected == 0 {
            return Err(not_found(id));
        }
        tracing::info!(author_id = id, "author deleted");
        Ok(())
    }
}

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("author {}", id))
}

async fn lock(conn: &mut PgConnection, id: i64) -> Result<LockedAuthor, AppError> {
    sqlx::query_as::<_, LockedAuthor>("SELECT id, email FROM authors WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| not_found(id))
}

async fn reload(conn: &mut PgConnection, id: i64) -> Result<Author, AppError> {
    fetch_optional(conn, &select_by_id(&AUTHOR_LIST, "a.id", id))
        .await?
        .ok_or_else(|| not_found(id))
}

async fn check_email(
    conn: &mut PgConnection,
    changes: &AuthorChanges,
    current: Option<&LockedAuthor>,
) -> Result<FieldErrors, AppError> {
    let mut errors = FieldErrors::new();
    if let Some(email) = &changes.email {
        let changed = current.map_or(true, |c| c.email != *email);
        if changed
            && exists(
                conn,
                "SELECT EXISTS(SELECT 1 FROM authors WHERE email = $1 AND id <> $2)",
                vec![email.as_str().into(), current.map_or(0, |c| c.id).into()],
            )
            .await?
        {
            errors.add("email", MSG_EMAIL_TAKEN);
        }
    }
    Ok(errors)
}

fn columns(changes: AuthorChanges) -> Vec<(&'static str, PgBindValue)> {
    let mut cols: Vec<(&'static str, PgBindValue)> = Vec::new();
    if let Some(v) = changes.first_name {
        cols.push(("first_name", v.into()));
    }
    if let Some(v) = changes.last_name {
        cols.push(("last_name", v.into()));
    }
    if let Some(v) = changes.email {
        cols.push(("email", v.into()));
    }
    if let Some(v) = changes.birth_date {
        cols.push(("birth_date", v.into()));
    }
    cols
}
