//! Request payload validation. Each resource has an explicit rule set per [`WriteMode`];
//! every failing field is collected so callers get all errors at once.
//!
//! Checks that need the store (uniqueness, foreign keys) live in the resource services
//! and merge into the same [`FieldErrors`].

use crate::error::FieldErrors;
use crate::models::BookStatus;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use regex::Regex;
use serde_json::{Map, Value};
use std::str::FromStr;
use std::sync::OnceLock;

pub type Payload = Map<String, Value>;

pub const MSG_REQUIRED: &str = "This field is required.";
pub const MSG_NULL: &str = "This field may not be null.";
pub const MSG_BLANK: &str = "This field may not be blank.";
pub const MSG_ISBN_LENGTH: &str = "ISBN must be either 10 or 13 characters long.";
pub const MSG_ISBN_TAKEN: &str = "A book with this ISBN already exists.";
pub const MSG_PAGES: &str = "Number of pages must be positive.";
pub const MSG_PRICE_NEGATIVE: &str = "Price cannot be negative.";
pub const MSG_EMAIL_TAKEN: &str = "An author with this email already exists.";
pub const MSG_CATEGORY_TAKEN: &str = "category with this name already exists.";
pub const MSG_USERNAME_TAKEN: &str = "A user with that username already exists.";

const PRICE_MAX_DIGITS: u64 = 10;
const PRICE_DECIMAL_PLACES: i64 = 2;
const PASSWORD_MIN_LENGTH: usize = 8;

/// Which rule set applies: create and full update enforce required fields, partial update
/// validates only the fields supplied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteMode {
    Create,
    Update,
    PartialUpdate,
}

impl WriteMode {
    fn enforces_required(self) -> bool {
        !matches!(self, WriteMode::PartialUpdate)
    }
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex"))
}

fn username_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[\w.@+-]+$").expect("username regex"))
}

/// Reads typed fields out of a JSON object, recording field errors as it goes.
/// `None` from a reader means "not supplied or invalid"; the error (if any) is already recorded.
struct FieldReader<'a> {
    body: &'a Payload,
    mode: WriteMode,
    errors: FieldErrors,
}

#[derive(Clone, Copy)]
struct TextRule {
    required: bool,
    allow_blank: bool,
    max_length: Option<usize>,
}

impl TextRule {
    const fn required(max_length: usize) -> Self {
        TextRule {
            required: true,
            allow_blank: false,
            max_length: Some(max_length),
        }
    }

    const fn free_text() -> Self {
        TextRule {
            required: false,
            allow_blank: true,
            max_length: None,
        }
    }
}

impl<'a> FieldReader<'a> {
    fn new(body: &'a Payload, mode: WriteMode) -> Self {
        FieldReader {
            body,
            mode,
            errors: FieldErrors::new(),
        }
    }

    /// Present value (null included), or records "required" when absent and required.
    fn raw(&mut self, field: &str, required: bool) -> Option<&'a Value> {
        let body: &'a Payload = self.body;
        match body.get(field) {
            Some(v) => Some(v),
            None => {
                if required && self.mode.enforces_required() {
                    self.errors.add(field, MSG_REQUIRED);
                }
                None
            }
        }
    }

    /// Non-null value; null is an error.
    fn non_null(&mut self, field: &str, required: bool) -> Option<&'a Value> {
        let v = self.raw(field, required)?;
        if v.is_null() {
            self.errors.add(field, MSG_NULL);
            return None;
        }
        Some(v)
    }

    fn text(&mut self, field: &str, rule: TextRule) -> Option<String> {
        let v = self.non_null(field, rule.required)?;
        let s = match v {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => {
                self.errors.add(field, "Not a valid string.");
                return None;
            }
        };
        if s.is_empty() && !rule.allow_blank {
            self.errors.add(field, MSG_BLANK);
            return None;
        }
        if let Some(max) = rule.max_length {
            if s.chars().count() > max {
                self.errors
                    .add(field, format!("Ensure this field has no more than {} characters.", max));
                return None;
            }
        }
        Some(s)
    }

    fn parse_date(&mut self, field: &str, v: &Value) -> Option<NaiveDate> {
        match v.as_str().map(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")) {
            Some(Ok(d)) => Some(d),
            _ => {
                self.errors.add(
                    field,
                    "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.",
                );
                None
            }
        }
    }

    fn date(&mut self, field: &str, required: bool) -> Option<NaiveDate> {
        let v = self.non_null(field, required)?;
        self.parse_date(field, v)
    }

    /// Nullable date: `Some(None)` clears it.
    fn nullable_date(&mut self, field: &str) -> Option<Option<NaiveDate>> {
        let v = self.raw(field, false)?;
        if v.is_null() {
            return Some(None);
        }
        self.parse_date(field, v).map(Some)
    }

    fn integer(&mut self, field: &str, required: bool) -> Option<i64> {
        let v = self.non_null(field, required)?;
        let n = integral(v);
        if n.is_none() {
            self.errors.add(field, "A valid integer is required.");
        }
        n
    }

    fn decimal(&mut self, field: &str, required: bool) -> Option<BigDecimal> {
        let v = self.non_null(field, required)?;
        let parsed = match v {
            Value::Number(n) => BigDecimal::from_str(&n.to_string()).ok(),
            Value::String(s) => BigDecimal::from_str(s.trim()).ok(),
            _ => None,
        };
        if parsed.is_none() {
            self.errors.add(field, "A valid number is required.");
        }
        parsed
    }

    fn parse_pk(&mut self, field: &str, v: &Value) -> Option<i64> {
        let pk = match v {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        if pk.is_none() {
            self.errors
                .add(field, format!("Incorrect type. Expected pk value, received {}.", json_kind(v)));
        }
        pk
    }

    fn pk(&mut self, field: &str, required: bool) -> Option<i64> {
        let v = self.non_null(field, required)?;
        self.parse_pk(field, v)
    }

    /// Nullable foreign key: `Some(None)` clears it.
    fn nullable_pk(&mut self, field: &str) -> Option<Option<i64>> {
        let v = self.raw(field, false)?;
        if v.is_null() {
            return Some(None);
        }
        self.parse_pk(field, v).map(Some)
    }

    fn finish<T>(self, value: T) -> (T, FieldErrors) {
        (value, self.errors)
    }
}

/// Whole number from a JSON number or string. `300.0` and `"300.0"` count; `300.5` does not.
pub fn integral(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => {
            let s = s.trim();
            let whole = match s.split_once('.') {
                Some((whole, zeros)) if zeros.chars().all(|c| c == '0') => whole,
                Some(_) => return None,
                None => s,
            };
            whole.parse::<i64>().ok()
        }
        _ => None,
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// Normalized book fields. `None` = leave unchanged (or use the column default on create).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BookChanges {
    pub title: Option<String>,
    pub isbn: Option<String>,
    pub description: Option<String>,
    pub publication_date: Option<NaiveDate>,
    pub pages: Option<i32>,
    pub price: Option<BigDecimal>,
    pub status: Option<BookStatus>,
    pub author: Option<i64>,
    pub category: Option<Option<i64>>,
}

pub fn validate_isbn(isbn: &str) -> Result<(), &'static str> {
    match isbn.chars().count() {
        10 | 13 => Ok(()),
        _ => Err(MSG_ISBN_LENGTH),
    }
}

pub fn validate_pages(pages: i64) -> Result<i32, String> {
    if pages <= 0 {
        return Err(MSG_PAGES.to_string());
    }
    i32::try_from(pages).map_err(|_| format!("Ensure this value is less than or equal to {}.", i32::MAX))
}

/// Non-negative, at most 2 decimal places and 10 digits. Returns the value at scale 2.
pub fn validate_price(price: &BigDecimal) -> Result<BigDecimal, String> {
    if *price < BigDecimal::from(0) {
        return Err(MSG_PRICE_NEGATIVE.to_string());
    }
    let (digits, exponent) = price.normalized().as_bigint_and_exponent();
    let digit_count = digits.to_string().trim_start_matches('-').len() as u64;
    // `exponent` is the scale: value = digits * 10^-exponent.
    let (total_digits, decimal_places) = if exponent <= 0 {
        (digit_count + exponent.unsigned_abs(), 0)
    } else if digit_count > exponent as u64 {
        (digit_count, exponent)
    } else {
        (exponent as u64, exponent)
    };
    let whole_digits = total_digits - decimal_places as u64;
    if total_digits > PRICE_MAX_DIGITS {
        return Err(format!(
            "Ensure that there are no more than {} digits in total.",
            PRICE_MAX_DIGITS
        ));
    }
    if decimal_places > PRICE_DECIMAL_PLACES {
        return Err(format!(
            "Ensure that there are no more than {} decimal places.",
            PRICE_DECIMAL_PLACES
        ));
    }
    if whole_digits > PRICE_MAX_DIGITS - PRICE_DECIMAL_PLACES as u64 {
        return Err(format!(
            "Ensure that there are no more than {} digits before the decimal point.",
            PRICE_MAX_DIGITS - PRICE_DECIMAL_PLACES as u64
        ));
    }
    Ok(price.with_scale(PRICE_DECIMAL_PLACES))
}

/// Field rules for a book payload. Uniqueness and foreign keys are checked by the caller.
pub fn validate_book(body: &Payload, mode: WriteMode) -> (BookChanges, FieldErrors) {
    let mut r = FieldReader::new(body, mode);

    let title = r.text("title", TextRule::required(200));
    let isbn = r.text("isbn", TextRule::required(13)).and_then(|isbn| match validate_isbn(&isbn) {
        Ok(()) => Some(isbn),
        Err(msg) => {
            r.errors.add("isbn", msg);
            None
        }
    });
    let description = r.text("description", TextRule::free_text());
    let publication_date = r.date("publication_date", true);
    let pages = r.integer("pages", true).and_then(|n| match validate_pages(n) {
        Ok(p) => Some(p),
        Err(msg) => {
            r.errors.add("pages", msg);
            None
        }
    });
    let price = r.decimal("price", true).and_then(|p| match validate_price(&p) {
        Ok(p) => Some(p),
        Err(msg) => {
            r.errors.add("price", msg);
            None
        }
    });
    let status = r.non_null("status", false).and_then(|v| {
        let parsed = v
            .as_str()
            .ok_or_else(|| format!("\"{}\" is not a valid choice.", v))
            .and_then(|s| s.parse::<BookStatus>().map_err(|e| e.to_string()));
        match parsed {
            Ok(s) => Some(s),
            Err(msg) => {
                r.errors.add("status", msg);
                None
            }
        }
    });
    let author = r.pk("author", true);
    let category = r.nullable_pk("category");

    r.finish(BookChanges {
        title,
        isbn,
        description,
        publication_date,
        pages,
        price,
        status,
        author,
        category,
    })
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AuthorChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub birth_date: Option<Option<NaiveDate>>,
}

pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email_regex().is_match(email) {
        Ok(())
    } else {
        Err("Enter a valid email address.")
    }
}

/// Field rules for an author payload. Email uniqueness is checked by the caller.
pub fn validate_author(body: &Payload, mode: WriteMode) -> (AuthorChanges, FieldErrors) {
    let mut r = FieldReader::new(body, mode);
    let first_name = r.text("first_name", TextRule::required(100));
    let last_name = r.text("last_name", TextRule::required(100));
    let email = r.text("email", TextRule::required(254)).and_then(|email| match validate_email(&email) {
        Ok(()) => Some(email),
        Err(msg) => {
            r.errors.add("email", msg);
            None
        }
    });
    let birth_date = r.nullable_date("birth_date");
    r.finish(AuthorChanges {
        first_name,
        last_name,
        email,
        birth_date,
    })
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CategoryChanges {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Field rules for a category payload. Name uniqueness is checked by the caller.
pub fn validate_category(body: &Payload, mode: WriteMode) -> (CategoryChanges, FieldErrors) {
    let mut r = FieldReader::new(body, mode);
    let name = r.text("name", TextRule::required(100));
    let description = r.text("description", TextRule::free_text());
    r.finish(CategoryChanges { name, description })
}

#[derive(Clone, Debug, PartialEq)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub email: String,
}

/// Registration payload: username (letters, digits and @.+-_, ≤150), password (≥8), optional email.
pub fn validate_registration(body: &Payload) -> Result<Registration, FieldErrors> {
    let mut r = FieldReader::new(body, WriteMode::Create);
    let username = r.text("username", TextRule::required(150)).and_then(|u| {
        if username_regex().is_match(&u) {
            Some(u)
        } else {
            r.errors.add(
                "username",
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            );
            None
        }
    });
    let password = r
        .non_null("password", true)
        .and_then(|v| match v.as_str() {
            Some(p) if p.chars().count() >= PASSWORD_MIN_LENGTH => Some(p.to_string()),
            Some(_) => {
                r.errors.add(
                    "password",
                    format!(
                        "This password is too short. It must contain at least {} characters.",
                        PASSWORD_MIN_LENGTH
                    ),
                );
                None
            }
            None => {
                r.errors.add("password", "Not a valid string.");
                None
            }
        });
    let email = r
        .text("email", TextRule::free_text())
        .and_then(|e| {
            if e.is_empty() {
                return Some(e);
            }
            match validate_email(&e) {
                Ok(()) => Some(e),
                Err(msg) => {
                    r.errors.add("email", msg);
                    None
                }
            }
        })
        .unwrap_or_default();

    let (_, errors) = r.finish(());
    match (username, password) {
        (Some(username), Some(password)) if errors.is_empty() => Ok(Registration {
            username,
            password,
            email,
        }),
        _ => Err(errors),
    }
}

/// Credentials for token exchange; both fields required, password not trimmed.
pub fn validate_credentials(body: &Payload) -> Result<(String, String), FieldErrors> {
    let mut r = FieldReader::new(body, WriteMode::Create);
    let username = r.text("username", TextRule::required(150));
    let password = r.non_null("password", true).and_then(|v| match v.as_str() {
        Some(p) if !p.is_empty() => Some(p.to_string()),
        Some(_) => {
            r.errors.add("password", MSG_BLANK);
            None
        }
        None => {
            r.errors.add("password", "Not a valid string.");
            None
        }
    });
    let (_, errors) = r.finish(());
    match (username, password) {
        (Some(u), Some(p)) if errors.is_empty() => Ok((u, p)),
        _ => Err(errors),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(v: Value) -> Payload {
        match v {
            Value::Object(m) => m,
            _ => panic!("object expected"),
        }
    }

    fn valid_book() -> Value {
        json!({
            "title": "Test Book",
            "isbn": "1234567890123",
            "description": "A test book",
            "publication_date": "2023-01-01",
            "pages": 300,
            "price": "19.99",
            "author": 1,
            "category": 2
        })
    }

    #[test]
    fn accepts_complete_book() {
        let (changes, errors) = validate_book(&payload(valid_book()), WriteMode::Create);
        assert!(errors.is_empty(), "{}", errors);
        assert_eq!(changes.isbn.as_deref(), Some("1234567890123"));
        assert_eq!(changes.pages, Some(300));
        assert_eq!(changes.price, Some(BigDecimal::from_str("19.99").unwrap()));
        assert_eq!(changes.status, None);
        assert_eq!(changes.category, Some(Some(2)));
    }

    #[test]
    fn reports_every_failing_field_together() {
        let mut body = valid_book();
        body["isbn"] = json!("123");
        body["pages"] = json!(0);
        body["price"] = json!(-1.5);
        let (_, errors) = validate_book(&payload(body), WriteMode::Create);
        assert_eq!(errors.get("isbn"), Some(&[MSG_ISBN_LENGTH.to_string()][..]));
        assert_eq!(errors.get("pages"), Some(&[MSG_PAGES.to_string()][..]));
        assert_eq!(errors.get("price"), Some(&[MSG_PRICE_NEGATIVE.to_string()][..]));
    }

    #[test]
    fn create_requires_fields_but_partial_update_does_not() {
        let body = payload(json!({ "title": "Only a title" }));
        let (_, errors) = validate_book(&body, WriteMode::Create);
        for field in ["isbn", "publication_date", "pages", "price", "author"] {
            assert_eq!(errors.get(field), Some(&[MSG_REQUIRED.to_string()][..]), "{}", field);
        }
        assert!(!errors.has("description"));
        assert!(!errors.has("status"));

        let (changes, errors) = validate_book(&body, WriteMode::PartialUpdate);
        assert!(errors.is_empty());
        assert_eq!(changes.title.as_deref(), Some("Only a title"));
        assert_eq!(changes.isbn, None);
    }

    #[test]
    fn full_update_enforces_required_fields() {
        let (_, errors) = validate_book(&payload(json!({ "title": "x" })), WriteMode::Update);
        assert!(errors.has("isbn"));
    }

    #[test]
    fn status_accepts_any_of_the_four_values() {
        for status in ["available", "borrowed", "maintenance", "retired"] {
            let (changes, errors) = validate_book(&payload(json!({ "status": status })), WriteMode::PartialUpdate);
            assert!(errors.is_empty());
            assert_eq!(changes.status.map(|s| s.as_str()), Some(status));
        }
        let (_, errors) = validate_book(&payload(json!({ "status": "lost" })), WriteMode::PartialUpdate);
        assert_eq!(errors.get("status"), Some(&["\"lost\" is not a valid choice.".to_string()][..]));
    }

    #[test]
    fn isbn_length_is_10_or_13() {
        assert!(validate_isbn("1234567890").is_ok());
        assert!(validate_isbn("1234567890123").is_ok());
        assert!(validate_isbn("12345678901").is_err());
        assert!(validate_isbn("").is_err());
    }

    #[test]
    fn price_precision_rules() {
        let d = |s: &str| BigDecimal::from_str(s).unwrap();
        assert_eq!(validate_price(&d("0")).unwrap(), d("0.00"));
        assert_eq!(validate_price(&d("19.9")).unwrap(), d("19.90"));
        assert_eq!(validate_price(&d("10.500")).unwrap(), d("10.50"));
        assert!(validate_price(&d("19.999")).unwrap_err().contains("2 decimal places"));
        assert!(validate_price(&d("1234567890.5")).unwrap_err().contains("10 digits"));
        assert!(validate_price(&d("123456789")).unwrap_err().contains("before the decimal point"));
        assert_eq!(validate_price(&d("-0.01")).unwrap_err(), MSG_PRICE_NEGATIVE);
    }

    #[test]
    fn numeric_strings_are_accepted() {
        let mut body = valid_book();
        body["pages"] = json!("250");
        body["author"] = json!("1");
        let (changes, errors) = validate_book(&payload(body), WriteMode::Create);
        assert!(errors.is_empty());
        assert_eq!(changes.pages, Some(250));
        assert_eq!(changes.author, Some(1));
    }

    #[test]
    fn numeric_isbn_and_integral_float_pages_are_accepted() {
        let mut body = valid_book();
        body["isbn"] = json!(1234567890);
        body["pages"] = json!(300.0);
        let (changes, errors) = validate_book(&payload(body), WriteMode::Create);
        assert!(errors.is_empty(), "{:?}", errors);
        assert_eq!(changes.isbn.as_deref(), Some("1234567890"));
        assert_eq!(changes.pages, Some(300));

        let mut body = valid_book();
        body["pages"] = json!(300.5);
        body["isbn"] = json!(true);
        let (_, errors) = validate_book(&payload(body), WriteMode::Create);
        assert!(errors.has("pages"));
        assert!(errors.has("isbn"));
    }

    #[test]
    fn integral_values() {
        assert_eq!(integral(&json!(7)), Some(7));
        assert_eq!(integral(&json!(7.0)), Some(7));
        assert_eq!(integral(&json!("7.00")), Some(7));
        assert_eq!(integral(&json!(" 12 ")), Some(12));
        assert_eq!(integral(&json!(7.5)), None);
        assert_eq!(integral(&json!("7.5")), None);
        assert_eq!(integral(&json!("seven")), None);
        assert_eq!(integral(&json!(null)), None);
    }

    #[test]
    fn null_category_clears_it_but_null_author_is_rejected() {
        let (changes, errors) =
            validate_book(&payload(json!({ "category": null, "author": null })), WriteMode::PartialUpdate);
        assert_eq!(changes.category, Some(None));
        assert_eq!(errors.get("author"), Some(&[MSG_NULL.to_string()][..]));
    }

    #[test]
    fn author_email_must_be_valid() {
        let body = payload(json!({ "first_name": "A", "last_name": "B", "email": "not-an-email" }));
        let (_, errors) = validate_author(&body, WriteMode::Create);
        assert!(errors.has("email"));

        let body = payload(json!({ "first_name": "A", "last_name": "B", "email": "a@x.com", "birth_date": null }));
        let (changes, errors) = validate_author(&body, WriteMode::Create);
        assert!(errors.is_empty());
        assert_eq!(changes.birth_date, Some(None));
    }

    #[test]
    fn category_name_is_required_and_bounded() {
        let (_, errors) = validate_category(&payload(json!({ "name": "  " })), WriteMode::Create);
        assert_eq!(errors.get("name"), Some(&[MSG_BLANK.to_string()][..]));
        let long = "x".repeat(101);
        let (_, errors) = validate_category(&payload(json!({ "name": long })), WriteMode::Create);
        assert!(errors.has("name"));
    }

    #[test]
    fn registration_rules() {
        let ok = validate_registration(&payload(json!({ "username": "reader.1", "password": "secret-pass" }))).unwrap();
        assert_eq!(ok.username, "reader.1");
        assert_eq!(ok.email, "");

        let errors =
            validate_registration(&payload(json!({ "username": "bad name", "password": "short" }))).unwrap_err();
        assert!(errors.has("username"));
        assert!(errors.has("password"));
    }

    #[test]
    fn credentials_require_both_fields() {
        let errors = validate_credentials(&payload(json!({ "username": "u" }))).unwrap_err();
        assert_eq!(errors.get("password"), Some(&[MSG_REQUIRED.to_string()][..]));
    }
}
