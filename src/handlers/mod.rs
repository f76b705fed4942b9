//! HTTP handlers for the catalog resources, lending actions and auth.

pub mod auth;
pub mod authors;
pub mod books;
pub mod categories;

use crate::error::AppError;
use crate::service::Payload;
use axum::extract::rejection::JsonRejection;
use axum::Json;
use serde_json::Value;

/// Path id; anything that is not an integer matches no row.
pub(crate) fn parse_id(raw: &str, resource: &str) -> Result<i64, AppError> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::NotFound(format!("{} {}", resource, raw)))
}

/// JSON body as an object; malformed JSON and non-object bodies are bad requests.
pub(crate) fn body_to_map(body: Result<Json<Value>, JsonRejection>) -> Result<Payload, AppError> {
    let Json(value) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    match value {
        Value::Object(m) => Ok(m),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn non_integer_ids_are_not_found() {
        assert_eq!(parse_id("42", "book").unwrap(), 42);
        assert!(matches!(parse_id("abc", "book"), Err(AppError::NotFound(_))));
    }

    #[test]
    fn body_must_be_an_object() {
        assert!(body_to_map(Ok(Json(json!({ "title": "x" })))).is_ok());
        assert!(matches!(body_to_map(Ok(Json(json!([1, 2])))), Err(AppError::BadRequest(_))));
    }
}
