//! Bookstore API: REST backend for a catalog of books, authors and categories,
//! with token-authenticated writes and guarded borrow/return transitions.

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod logging;
pub mod middleware;
pub mod models;
pub mod openapi;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use config::Settings;
pub use error::{AppError, ConfigError, FieldErrors};
pub use logging::init_tracing;
pub use response::{success_many, success_one, success_one_ok};
pub use routes::build_app;
pub use service::{AuthService, AuthorService, BookService, CategoryService, WriteMode};
pub use state::AppState;
pub use store::{ensure_database_exists, ensure_tables};
