//! Categories: list/search and CRUD. Deleting a category detaches its books.

use super::validation::{validate_category, CategoryChanges, Payload, WriteMode, MSG_CATEGORY_TAKEN};
use super::{execute, exists, fetch_all, fetch_optional, insert_returning_id};
use crate::error::{AppError, FieldErrors};
use crate::models::Category;
use crate::sql::{delete, insert, select_by_id, select_list, update, ListSpec, OrderingSpec, PgBindValue};
use sqlx::{PgConnection, PgPool};
use std::collections::HashMap;

pub(crate) static CATEGORY_LIST: ListSpec = ListSpec {
    select: "SELECT c.id, c.name, c.description, c.created_at, \
             (SELECT COUNT(*) FROM books b WHERE b.category_id = c.id) AS books_count \
             FROM categories c",
    filters: &[],
    search_columns: &["c.name", "c.description"],
    ordering: &[
        OrderingSpec { key: "name", column: "c.name" },
        OrderingSpec { key: "created_at", column: "c.created_at" },
    ],
    default_ordering: &["name"],
    tiebreaker: "c.id",
};

#[derive(Debug, sqlx::FromRow)]
struct LockedCategory {
    id: i64,
    name: String,
}

pub struct CategoryService;

impl CategoryService {
    pub async fn list(pool: &PgPool, params: &HashMap<String, String>) -> Result<Vec<Category>, AppError> {
        let query = CATEGORY_LIST.parse_params(params)?;
        fetch_all(pool, &select_list(&CATEGORY_LIST, &query)).await
    }

    pub async fn read(pool: &PgPool, id: i64) -> Result<Category, AppError> {
        fetch_optional(pool, &select_by_id(&CATEGORY_LIST, "c.id", id))
            .await?
            .ok_or_else(|| not_found(id))
    }

    pub async fn create(pool: &PgPool, body: &Payload) -> Result<Category, AppError> {
        let (changes, mut errors) = validate_category(body, WriteMode::Create);
        let mut tx = pool.begin().await?;
        errors.merge(check_name(&mut tx, &changes, None).await?);
        errors.into_result()?;

        let id = insert_returning_id(&mut *tx, &insert("categories", columns(changes))).await?;
        let category = reload(&mut tx, id).await?;
        tx.commit().await?;
        tracing::info!(category_id = id, name = %category.name, "category created");
        Ok(category)
    }

    pub async fn update(pool: &PgPool, id: i64, body: &Payload, mode: WriteMode) -> Result<Category, AppError> {
        let mut tx = pool.begin().await?;
        let current = lock(&mut tx, id).await?;
        let (changes, mut errors) = validate_category(body, mode);
        errors.merge(check_name(&mut tx, &changes, Some(&current)).await?);
        errors.into_result()?;

        // No updated_at column; an empty PATCH writes nothing.
        if let Some(q) = update("categories", current.id, columns(changes), false) {
            execute(&mut *tx, &q).await?;
        }
        let category = reload(&mut tx, id).await?;
        tx.commit().await?;
        Ok(category)
    }

    /// Books in the category keep existing with no category.
    pub async fn delete(pool: &PgPool, id: i64) -> Result<(), AppError> {
        let affected = execute(pool, &delete("categories", id)).await?;
        if affected == 0 {
            return Err(not_found(id));
        }
        tracing::info!(category_id = id, "category deleted");
        Ok(())
    }
}

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("category {}", id))
}

async fn lock(conn: &mut PgConnection, id: i64) -> Result<LockedCategory, AppError> {
    sqlx::query_as::<_, LockedCategory>("SELECT id, name FROM categories WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| not_found(id))
}

async fn reload(conn: &mut PgConnection, id: i64) -> Result<Category, AppError> {
    fetch_optional(conn, &select_by_id(&CATEGORY_LIST, "c.id", id))
        .await?
        .ok_or_else(|| not_found(id))
}

async fn check_name(
    conn: &mut PgConnection,
    changes: &CategoryChanges,
    current: Option<&LockedCategory>,
) -> Result<FieldErrors, AppError> {
    let mut errors = FieldErrors::new();
    if let Some(name) = &changes.name {
        let changed = current.map_or(true, |c| c.name != *name);
        if changed
            && exists(
                conn,
                "SELECT EXISTS(SELECT 1 FROM categories WHERE name = $1 AND id <> $2)",
                vec![name.as_str().into(), current.map_or(0, |c| c.id).into()],
            )
            .await?
        {
            errors.add("name", MSG_CATEGORY_TAKEN);
        }
    }
    Ok(errors)
}

fn columns(changes: CategoryChanges) -> Vec<(&'static str, PgBindValue)> {
    let mut cols: Vec<(&'static str, PgBindValue)> = Vec::new();
    if let Some(v) = changes.name {
        cols.push(("name", v.into()));
    }
    if let Some(v) = changes.description {
        cols.push(("description", v.into()));
    }
    cols
}
