//! Book record, its lending status and the guarded borrow/return transitions.

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BookStatus {
    Available,
    Borrowed,
    Maintenance,
    Retired,
}

impl BookStatus {
    pub const ALL: [BookStatus; 4] = [
        BookStatus::Available,
        BookStatus::Borrowed,
        BookStatus::Maintenance,
        BookStatus::Retired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookStatus::Available => "available",
            BookStatus::Borrowed => "borrowed",
            BookStatus::Maintenance => "maintenance",
            BookStatus::Retired => "retired",
        }
    }
}

impl Default for BookStatus {
    fn default() -> Self {
        BookStatus::Available
    }
}

impl std::fmt::Display for BookStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("\"{0}\" is not a valid choice.")]
pub struct InvalidStatus(pub String);

impl std::str::FromStr for BookStatus {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BookStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| InvalidStatus(s.to_string()))
    }
}

impl TryFrom<String> for BookStatus {
    type Error = InvalidStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Guarded lending transitions. Generic updates may still write any status directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LendingAction {
    Borrow,
    Return,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Book is not available for borrowing")]
    NotAvailable { current: BookStatus },
    #[error("Book is not currently borrowed")]
    NotBorrowed { current: BookStatus },
}

impl LendingAction {
    /// Next status, or the reason the transition is refused from `current`.
    pub fn apply(self, current: BookStatus) -> Result<BookStatus, TransitionError> {
        match (self, current) {
            (LendingAction::Borrow, BookStatus::Available) => Ok(BookStatus::Borrowed),
            (LendingAction::Borrow, current) => Err(TransitionError::NotAvailable { current }),
            (LendingAction::Return, BookStatus::Borrowed) => Ok(BookStatus::Available),
            (LendingAction::Return, current) => Err(TransitionError::NotBorrowed { current }),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LendingAction::Borrow => "mark_as_borrowed",
            LendingAction::Return => "mark_as_returned",
        }
    }
}

/// Book row joined with its author's and category's display names.
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub isbn: String,
    pub description: String,
    pub publication_date: NaiveDate,
    pub pages: i32,
    pub price: BigDecimal,
    #[sqlx(try_from = "String")]
    pub status: BookStatus,
    pub author_id: i64,
    pub category_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author_name: String,
    pub category_name: Option<String>,
}

impl Book {
    pub fn is_available(&self) -> bool {
        self.status == BookStatus::Available
    }

    /// Whole 365-day years since publication, as of `today`.
    pub fn age_in_years_on(&self, today: NaiveDate) -> i64 {
        (today - self.publication_date).num_days().div_euclid(365)
    }

    pub fn age_in_years(&self) -> i64 {
        self.age_in_years_on(Utc::now().date_naive())
    }
}

/// Serialized book: stored fields plus derived display fields.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct BookOut {
    pub id: i64,
    pub title: String,
    pub isbn: String,
    pub description: String,
    pub publication_date: NaiveDate,
    pub pages: i32,
    #[schema(value_type = String, example = "19.99")]
    pub price: BigDecimal,
    pub status: BookStatus,
    pub author: i64,
    pub category: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author_name: String,
    pub category_name: Option<String>,
    pub age_in_years: i64,
    pub is_available: bool,
}

impl From<Book> for BookOut {
    fn from(book: Book) -> Self {
        let age_in_years = book.age_in_years();
        let is_available = book.is_available();
        BookOut {
            id: book.id,
            title: book.title,
            isbn: book.isbn,
            description: book.description,
            publication_date: book.publication_date,
            pages: book.pages,
            price: book.price,
            status: book.status,
            author: book.author_id,
            category: book.category_id,
            created_at: book.created_at,
            updated_at: book.updated_at,
            author_name: book.author_name,
            category_name: book.category_name,
            age_in_years,
            is_available,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn sample(status: BookStatus, published: NaiveDate) -> Book {
        Book {
            id: 1,
            title: "Test Book".into(),
            isbn: "1234567890123".into(),
            description: String::new(),
            publication_date: published,
            pages: 300,
            price: BigDecimal::from_str("19.99").unwrap(),
            status,
            author_id: 1,
            category_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            author_name: "Jane Smith".into(),
            category_name: None,
        }
    }

    #[test]
    fn borrow_only_from_available() {
        assert_eq!(LendingAction::Borrow.apply(BookStatus::Available), Ok(BookStatus::Borrowed));
        for current in [BookStatus::Borrowed, BookStatus::Maintenance, BookStatus::Retired] {
            assert_eq!(
                LendingAction::Borrow.apply(current),
                Err(TransitionError::NotAvailable { current })
            );
        }
    }

    #[test]
    fn return_only_from_borrowed() {
        assert_eq!(LendingAction::Return.apply(BookStatus::Borrowed), Ok(BookStatus::Available));
        for current in [BookStatus::Available, BookStatus::Maintenance, BookStatus::Retired] {
            assert!(LendingAction::Return.apply(current).is_err());
        }
    }

    #[test]
    fn status_parses_only_known_values() {
        for status in BookStatus::ALL {
            assert_eq!(status.as_str().parse::<BookStatus>(), Ok(status));
        }
        let err = "lost".parse::<BookStatus>().unwrap_err();
        assert_eq!(err.to_string(), "\"lost\" is not a valid choice.");
        assert_eq!(BookStatus::default(), BookStatus::Available);
    }

    #[test]
    fn age_is_floored_years_of_365_days() {
        let book = sample(BookStatus::Available, NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        assert_eq!(book.age_in_years_on(NaiveDate::from_ymd_opt(2020, 12, 30).unwrap()), 0);
        assert_eq!(book.age_in_years_on(NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()), 3);
        // Future publication dates floor to -1.
        assert_eq!(book.age_in_years_on(NaiveDate::from_ymd_opt(2019, 12, 31).unwrap()), -1);
    }

    #[test]
    fn serialized_book_carries_derived_fields() {
        let book = sample(BookStatus::Borrowed, NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        let json = serde_json::to_value(BookOut::from(book)).unwrap();
        assert_eq!(json["status"], "borrowed");
        assert_eq!(json["is_available"], false);
        assert_eq!(json["author_name"], "Jane Smith");
        assert_eq!(json["author"], 1);
        assert!(json["category"].is_null());
        assert!(json.get("age_in_years").is_some());
    }
}
