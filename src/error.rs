//! Typed errors and HTTP mapping.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Key used for errors that are not tied to a single field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}' ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Field-scoped validation failures: field name -> messages. Every failing field is kept.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        FieldErrors(BTreeMap::new())
    }

    /// Single-field error, e.g. a uniqueness violation reported by the store.
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn merge(&mut self, other: FieldErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Ok when nothing was collected, otherwise a validation error carrying all fields.
    pub fn into_result(self) -> Result<(), AppError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self))
        }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join(" ")))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation: {0}")]
    Validation(FieldErrors),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("password hashing: {0}")]
    PasswordHash(String),
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        self.status_and_code().0
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            AppError::Db(e) => {
                if let sqlx::Error::RowNotFound = e {
                    (StatusCode::NOT_FOUND, "not_found")
                } else {
                    (StatusCode::INTERNAL_SERVER_ERROR, "database_error")
                }
            }
            AppError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AppError::PasswordHash(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }

    /// Field-level detail map. Non-validation errors use the general key.
    fn details(&self) -> Option<serde_json::Value> {
        match self {
            AppError::Validation(errors) => serde_json::to_value(errors).ok(),
            AppError::Conflict(msg) | AppError::BadRequest(msg) | AppError::Unauthorized(msg) => {
                Some(serde_json::json!({ NON_FIELD_ERRORS: [msg] }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let message = match &self {
            // Store internals stay in the log.
            AppError::Db(_) | AppError::PasswordHash(_) if status.is_server_error() => {
                "internal server error".to_string()
            }
            _ => self.to_string(),
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: self.details(),
            },
        };
        if status == StatusCode::UNAUTHORIZED {
            return (status, [(header::WWW_AUTHENTICATE, "Token")], Json(body)).into_response();
        }
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_errors_keep_every_field() {
        let mut errors = FieldErrors::new();
        errors.add("isbn", "ISBN must be either 10 or 13 characters long.");
        errors.add("pages", "Number of pages must be positive.");
        errors.add("pages", "A valid integer is required.");
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["isbn", "pages"]);
        assert_eq!(errors.get("pages").map(<[String]>::len), Some(2));
        assert!(errors.into_result().is_err());
    }

    #[test]
    fn merge_appends_messages() {
        let mut a = FieldErrors::single("email", "Enter a valid email address.");
        a.merge(FieldErrors::single("email", "An author with this email already exists."));
        assert_eq!(a.get("email").map(<[String]>::len), Some(2));
    }

    #[test]
    fn status_mapping() {
        assert_eq!(
            AppError::Validation(FieldErrors::single("x", "y")).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::Conflict("c".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(AppError::Unauthorized("u".into()).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Db(sqlx::Error::RowNotFound).status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn validation_details_serialize_as_field_map() {
        let err = AppError::Validation(FieldErrors::single("price", "Price cannot be negative."));
        let details = err.details().unwrap();
        assert_eq!(details["price"][0], "Price cannot be negative.");
    }
}
