//! Books: list/search, CRUD, and the guarded lending transitions.

use super::validation::{validate_book, BookChanges, Payload, WriteMode, MSG_ISBN_TAKEN};
use super::{execute, exists, fetch_all, fetch_optional, insert_returning_id};
use crate::error::{AppError, FieldErrors};
use crate::models::{Book, BookStatus, LendingAction};
use crate::sql::{
    delete, insert, select_by_id, select_list, update, FilterKind, FilterSpec, ListSpec, OrderingSpec,
    PgBindValue,
};
use sqlx::{PgConnection, PgPool};
use std::collections::HashMap;

pub(crate) static BOOK_LIST: ListSpec = ListSpec {
    select: "SELECT b.id, b.title, b.isbn, b.description, b.publication_date, b.pages, b.price, b.status, \
             b.author_id, b.category_id, b.created_at, b.updated_at, \
             (a.first_name || ' ' || a.last_name) AS author_name, c.name AS category_name \
             FROM books b JOIN authors a ON a.id = b.author_id \
             LEFT JOIN categories c ON c.id = b.category_id",
    filters: &[
        FilterSpec { param: "status", column: "b.status", kind: FilterKind::Status },
        FilterSpec { param: "category", column: "b.category_id", kind: FilterKind::Id },
        FilterSpec { param: "author", column: "b.author_id", kind: FilterKind::Id },
    ],
    search_columns: &["b.title", "b.description", "a.first_name", "a.last_name"],
    ordering: &[
        OrderingSpec { key: "created_at", column: "b.created_at" },
        OrderingSpec { key: "publication_date", column: "b.publication_date" },
        OrderingSpec { key: "title", column: "b.title" },
        OrderingSpec { key: "price", column: "b.price" },
    ],
    default_ordering: &["-created_at"],
    tiebreaker: "b.id",
};

const MSG_DELETE_BORROWED: &str = "Cannot delete a book that is currently borrowed.";

/// Columns read under the row lock before a write.
#[derive(Debug, sqlx::FromRow)]
struct LockedBook {
    id: i64,
    isbn: String,
    #[sqlx(try_from = "String")]
    status: BookStatus,
}

pub struct BookService;

impl BookService {
    pub async fn list(pool: &PgPool, params: &HashMap<String, String>) -> Result<Vec<Book>, AppError> {
        let query = BOOK_LIST.parse_params(params)?;
        fetch_all(pool, &select_list(&BOOK_LIST, &query)).await
    }

    /// Every available book, default ordering, no paging. Other query parameters are ignored.
    pub async fn available(pool: &PgPool) -> Result<Vec<Book>, AppError> {
        let query = BOOK_LIST.fixed_filter("b.status", PgBindValue::text(BookStatus::Available.as_str()));
        fetch_all(pool, &select_list(&BOOK_LIST, &query)).await
    }

    /// Books of one author; `author_id` must be present and an integer.
    pub async fn by_author(pool: &PgPool, params: &HashMap<String, String>) -> Result<Vec<Book>, AppError> {
        let raw = params
            .get("author_id")
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::BadRequest("author_id parameter is required".into()))?;
        let author_id: i64 = raw
            .parse()
            .map_err(|_| AppError::BadRequest("author_id must be an integer".into()))?;
        let query = BOOK_LIST.fixed_filter("b.author_id", PgBindValue::int(author_id));
        fetch_all(pool, &select_list(&BOOK_LIST, &query)).await
    }

    pub async fn read(pool: &PgPool, id: i64) -> Result<Book, AppError> {
        fetch_optional(pool, &select_by_id(&BOOK_LIST, "b.id", id))
            .await?
            .ok_or_else(|| not_found(id))
    }

    pub async fn create(pool: &PgPool, body: &Payload) -> Result<Book, AppError> {
        let (changes, mut errors) = validate_book(body, WriteMode::Create);
        let mut tx = pool.begin().await?;
        errors.merge(check_store_rules(&mut tx, &changes, None).await?);
        errors.into_result()?;

        let id = insert_returning_id(&mut *tx, &insert("books", columns(changes))).await?;
        let book = reload(&mut tx, id).await?;
        tx.commit().await?;
        tracing::info!(book_id = id, isbn = %book.isbn, "book created");
        Ok(book)
    }

    /// PUT (`WriteMode::Update`) or PATCH (`WriteMode::PartialUpdate`).
    pub async fn update(pool: &PgPool, id: i64, body: &Payload, mode: WriteMode) -> Result<Book, AppError> {
        let mut tx = pool.begin().await?;
        let current = lock(&mut tx, id).await?;
        let (changes, mut errors) = validate_book(body, mode);
        errors.merge(check_store_rules(&mut tx, &changes, Some(&current)).await?);
        errors.into_result()?;

        if let Some(status) = changes.status.filter(|s| *s != current.status) {
            tracing::warn!(
                book_id = id,
                from = %current.status,
                to = %status,
                "status written directly by update, lending guards not applied"
            );
        }
        if let Some(q) = update("books", current.id, columns(changes), true) {
            execute(&mut *tx, &q).await?;
        }
        let book = reload(&mut tx, id).await?;
        tx.commit().await?;
        Ok(book)
    }

    /// Refused while the book is borrowed.
    pub async fn delete(pool: &PgPool, id: i64) -> Result<(), AppError> {
        let mut tx = pool.begin().await?;
        let current = lock(&mut tx, id).await?;
        if current.status == BookStatus::Borrowed {
            return Err(AppError::Conflict(MSG_DELETE_BORROWED.into()));
        }
        execute(&mut *tx, &delete("books", id)).await?;
        tx.commit().await?;
        tracing::info!(book_id = id, "book deleted");
        Ok(())
    }

    /// Borrow or return. The guard is evaluated on the locked row, so concurrent
    /// transitions on one book serialize and at most one succeeds.
    pub async fn transition(pool: &PgPool, id: i64, action: LendingAction) -> Result<Book, AppError> {
        let mut tx = pool.begin().await?;
        let current = lock(&mut tx, id).await?;
        let next = action.apply(current.status).map_err(|e| {
            tracing::debug!(book_id = id, action = action.name(), error = %e, "transition refused");
            AppError::Conflict(e.to_string())
        })?;
        if let Some(q) = update("books", id, vec![("status", next.as_str().into())], true) {
            execute(&mut *tx, &q).await?;
        }
        let book = reload(&mut tx, id).await?;
        tx.commit().await?;
        tracing::info!(book_id = id, action = action.name(), from = %current.status, to = %next, "book status changed");
        Ok(book)
    }
}

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("book {}", id))
}

async fn lock(conn: &mut PgConnection, id: i64) -> Result<LockedBook, AppError> {
    tracing::debug!(book_id = id, "lock book row");
    sqlx::query_as::<_, LockedBook>("SELECT id, isbn, status FROM books WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| not_found(id))
}

async fn reload(conn: &mut PgConnection, id: i64) -> Result<Book, AppError> {
    fetch_optional(conn, &select_by_id(&BOOK_LIST, "b.id", id))
        .await?
        .ok_or_else(|| not_found(id))
}

/// ISBN uniqueness (on create, or when changed) and author/category existence.
async fn check_store_rules(
    conn: &mut PgConnection,
    changes: &BookChanges,
    current: Option<&LockedBook>,
) -> Result<FieldErrors, AppError> {
    let mut errors = FieldErrors::new();

    if let Some(isbn) = &changes.isbn {
        let changed = current.map_or(true, |c| c.isbn != *isbn);
        if changed
            && exists(
                &mut *conn,
                "SELECT EXISTS(SELECT 1 FROM books WHERE isbn = $1 AND id <> $2)",
                vec![isbn.as_str().into(), current.map_or(0, |c| c.id).into()],
            )
            .await?
        {
            errors.add("isbn", MSG_ISBN_TAKEN);
        }
    }
    if let Some(author) = changes.author {
        if !exists(&mut *conn, "SELECT EXISTS(SELECT 1 FROM authors WHERE id = $1)", vec![author.into()]).await? {
            errors.add("author", missing_pk(author));
        }
    }
    if let Some(Some(category)) = changes.category {
        if !exists(&mut *conn, "SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1)", vec![category.into()])
            .await?
        {
            errors.add("category", missing_pk(category));
        }
    }
    Ok(errors)
}

fn missing_pk(id: i64) -> String {
    format!("Invalid pk \"{}\" - object does not exist.", id)
}

/// Supplied fields as column assignments. Absent fields keep their value (or the column default).
fn columns(changes: BookChanges) -> Vec<(&'static str, PgBindValue)> {
    let mut cols: Vec<(&'static str, PgBindValue)> = Vec::new();
    if let Some(v) = changes.title {
        cols.push(("title", v.into()));
    }
    if let Some(v) = changes.isbn {
        cols.push(("isbn", v.into()));
    }
    if let Some(v) = changes.description {
        cols.push(("description", v.into()));
    }
    if let Some(v) = changes.publication_date {
        cols.push(("publication_date", v.into()));
    }
    if let Some(v) = changes.pages {
        cols.push(("pages", v.into()));
    }
    if let Some(v) = changes.price {
        cols.push(("price", v.into()));
    }
    if let Some(v) = changes.status {
        cols.push(("status", v.as_str().into()));
    }
    if let Some(v) = changes.author {
        cols.push(("author_id", v.into()));
    }
    if let Some(v) = changes.category {
        cols.push(("category_id", v.into()));
    }
    cols
}
