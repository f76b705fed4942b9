//! Builds parameterized SELECT lists, INSERT, UPDATE and DELETE statements.
//! Identifiers only ever come from static resource specs; request data is always bound.

use crate::error::{AppError, FieldErrors};
use crate::models::BookStatus;
use crate::sql::PgBindValue;
use std::collections::HashMap;

/// Upper bound on an explicit `limit`. Without one the whole result is returned.
pub const MAX_LIMIT: u32 = 1000;

/// Quote identifier for PostgreSQL (safe: only from static specs).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<PgBindValue>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    /// Appends a bound value and returns its `$n` number.
    fn push_param(&mut self, v: PgBindValue) -> u32 {
        let n = self.params.len() as u32 + 1;
        self.params.push(v);
        n
    }
}

/// How a filter query parameter is parsed before it is bound.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterKind {
    /// Integer foreign key.
    Id,
    /// One of the book status values.
    Status,
}

/// Exact-match filter: query parameter name -> column expression.
#[derive(Clone, Copy, Debug)]
pub struct FilterSpec {
    pub param: &'static str,
    pub column: &'static str,
    pub kind: FilterKind,
}

/// Allowed ordering key -> column expression.
#[derive(Clone, Copy, Debug)]
pub struct OrderingSpec {
    pub key: &'static str,
    pub column: &'static str,
}

/// Static description of one listable resource.
#[derive(Debug)]
pub struct ListSpec {
    /// `SELECT … FROM … [JOIN …]` without WHERE/ORDER.
    pub select: &'static str,
    pub filters: &'static [FilterSpec],
    /// Column expressions matched case-insensitively by each search term.
    pub search_columns: &'static [&'static str],
    pub ordering: &'static [OrderingSpec],
    /// Ordering keys (with optional `-`) used when the request gives none that are allowed.
    pub default_ordering: &'static [&'static str],
    /// Appended last so equal sort keys still come back in a stable order.
    pub tiebreaker: &'static str,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderTerm {
    pub column: &'static str,
    pub descending: bool,
}

/// Filters, search terms, ordering and paging for one list request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ListQuery {
    pub filters: Vec<(&'static str, PgBindValue)>,
    pub search_terms: Vec<String>,
    pub ordering: Vec<OrderTerm>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ListSpec {
    /// Parse `filter`/`search`/`ordering`/`limit`/`offset` query parameters.
    /// Unknown parameters and unknown ordering keys are ignored; malformed filter values are field errors.
    pub fn parse_params(&self, params: &HashMap<String, String>) -> Result<ListQuery, AppError> {
        let mut errors = FieldErrors::new();
        let mut filters = Vec::new();
        for spec in self.filters {
            let Some(raw) = params.get(spec.param).map(|s| s.trim()).filter(|s| !s.is_empty()) else {
                continue;
            };
            match parse_filter_value(spec.kind, raw) {
                Ok(value) => filters.push((spec.column, value)),
                Err(msg) => errors.add(spec.param, msg),
            }
        }

        let limit = parse_paging(&mut errors, "limit", params.get("limit"));
        let offset = parse_paging(&mut errors, "offset", params.get("offset"));
        errors.into_result()?;

        Ok(ListQuery {
            filters,
            search_terms: search_terms(params.get("search").map(String::as_str)),
            ordering: self.parse_ordering(params.get("ordering").map(String::as_str)),
            limit: limit.map(|n| n.min(MAX_LIMIT)),
            offset,
        })
    }

    /// Comma-separated keys, `-` prefix for descending. Falls back to the default ordering.
    pub fn parse_ordering(&self, raw: Option<&str>) -> Vec<OrderTerm> {
        let requested: Vec<OrderTerm> = raw
            .unwrap_or("")
            .split(',')
            .filter_map(|term| self.order_term(term.trim()))
            .collect();
        if !requested.is_empty() {
            return requested;
        }
        self.default_ordering
            .iter()
            .filter_map(|term| self.order_term(term))
            .collect()
    }

    fn order_term(&self, term: &str) -> Option<OrderTerm> {
        let (key, descending) = match term.strip_prefix('-') {
            Some(key) => (key, true),
            None => (term, false),
        };
        self.ordering
            .iter()
            .find(|o| o.key == key)
            .map(|o| OrderTerm {
                column: o.column,
                descending,
            })
    }

    /// Query for one fixed filter (e.g. status = available) with default ordering and no paging.
    pub fn fixed_filter(&self, column: &'static str, value: PgBindValue) -> ListQuery {
        ListQuery {
            filters: vec![(column, value)],
            ordering: self.parse_ordering(None),
            ..ListQuery::default()
        }
    }
}

fn parse_filter_value(kind: FilterKind, raw: &str) -> Result<PgBindValue, String> {
    match kind {
        FilterKind::Id => raw
            .parse::<i64>()
            .map(PgBindValue::int)
            .map_err(|_| "Enter a whole number.".to_string()),
        FilterKind::Status => raw
            .parse::<BookStatus>()
            .map(|s| PgBindValue::text(s.as_str()))
            .map_err(|_| format!("Select a valid choice. {} is not one of the available choices.", raw)),
    }
}

fn parse_paging(errors: &mut FieldErrors, name: &str, raw: Option<&String>) -> Option<u32> {
    let raw = raw.map(|s| s.trim()).filter(|s| !s.is_empty())?;
    match raw.parse::<u32>() {
        Ok(n) => Some(n),
        Err(_) => {
            errors.add(name, "A valid non-negative integer is required.");
            None
        }
    }
}

/// Split a search string into terms on whitespace and commas.
pub fn search_terms(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or("")
        .split(|c: char| c.is_whitespace() || c == ',')
        .map(|t| t.replace('\0', ""))
        .filter(|t| !t.is_empty())
        .collect()
}

/// Escape LIKE wildcards so a term matches literally as a substring.
fn like_pattern(term: &str) -> String {
    let escaped = term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    format!("%{}%", escaped)
}

/// SELECT list: filters are ANDed, each search term must match at least one search column,
/// ordering terms then the tiebreaker, then optional LIMIT/OFFSET.
pub fn select_list(spec: &ListSpec, query: &ListQuery) -> QueryBuf {
    let mut q = QueryBuf::new();

    let mut where_parts = Vec::new();
    for (column, value) in &query.filters {
        let n = q.push_param(value.clone());
        where_parts.push(format!("{} = ${}", column, n));
    }
    if !spec.search_columns.is_empty() {
        for term in &query.search_terms {
            let n = q.push_param(PgBindValue::text(like_pattern(term)));
            let any_column: Vec<String> = spec
                .search_columns
                .iter()
                .map(|c| format!("{} ILIKE ${}", c, n))
                .collect();
            where_parts.push(format!("({})", any_column.join(" OR ")));
        }
    }
    let where_clause = if where_parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", where_parts.join(" AND "))
    };

    let mut order_parts: Vec<String> = query
        .ordering
        .iter()
        .map(|t| format!("{} {}", t.column, if t.descending { "DESC" } else { "ASC" }))
        .collect();
    let tiebreak_desc = query.ordering.first().map(|t| t.descending).unwrap_or(false);
    order_parts.push(format!("{} {}", spec.tiebreaker, if tiebreak_desc { "DESC" } else { "ASC" }));
    let order_clause = format!(" ORDER BY {}", order_parts.join(", "));

    let limit_clause = query.limit.map(|n| format!(" LIMIT {}", n.min(MAX_LIMIT))).unwrap_or_default();
    let offset_clause = query.offset.map(|n| format!(" OFFSET {}", n)).unwrap_or_default();

    q.sql = format!(
        "{}{}{}{}{}",
        spec.select, where_clause, order_clause, limit_clause, offset_clause
    );
    q
}

/// SELECT one row of a resource by its id column.
pub fn select_by_id(spec: &ListSpec, id_column: &str, id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(PgBindValue::int(id));
    q.sql = format!("{} WHERE {} = ${}", spec.select, id_column, n);
    q
}

/// INSERT the given columns and return the new id.
pub fn insert(table: &str, values: Vec<(&str, PgBindValue)>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::with_capacity(values.len());
    let mut placeholders = Vec::with_capacity(values.len());
    for (col, value) in values {
        cols.push(quoted(col));
        let n = q.push_param(value);
        placeholders.push(format!("${}", n));
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING id",
        quoted(table),
        cols.join(", "),
        placeholders.join(", ")
    );
    q
}

/// UPDATE the given columns of one row. `touch_updated_at` also sets `updated_at = NOW()`.
/// None when there is nothing to write.
pub fn update(table: &str, id: i64, values: Vec<(&str, PgBindValue)>, touch_updated_at: bool) -> Option<QueryBuf> {
    let mut q = QueryBuf::new();
    let mut sets = Vec::with_capacity(values.len() + 1);
    for (col, value) in values {
        let n = q.push_param(value);
        sets.push(format!("{} = ${}", quoted(col), n));
    }
    if sets.is_empty() && !touch_updated_at {
        return None;
    }
    if touch_updated_at {
        sets.push(format!("{} = NOW()", quoted("updated_at")));
    }
    let n = q.push_param(PgBindValue::int(id));
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = ${}",
        quoted(table),
        sets.join(", "),
        quoted("id"),
        n
    );
    Some(q)
}

/// DELETE one row by id. Caller binds nothing else.
pub fn delete(table: &str, id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(PgBindValue::int(id));
    q.sql = format!("DELETE FROM {} WHERE {} = ${}", quoted(table), quoted("id"), n);
    q
}
