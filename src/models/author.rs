//! Author record.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// Author row with derived `full_name` and `books_count` filled in by the select.
#[derive(Clone, Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct Author {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub birth_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub full_name: String,
    pub books_count: i64,
}
