//! Resource routes under `/api/v1`.

use crate::handlers::{auth, authors, books, categories};
use crate::state::AppState;
use axum::{
    routing::{get, patch, post},
    Router,
};

pub const API_PREFIX: &str = "/api/v1";

/// Paths are declared without the trailing slash; the app trims it before routing.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/books", get(books::list_books).post(books::create_book))
        .route("/books/available", get(books::available_books))
        .route("/books/by_author", get(books::books_by_author))
        .route(
            "/books/:id",
            get(books::read_book)
                .put(books::update_book)
                .patch(books::partial_update_book)
                .delete(books::delete_book),
        )
        .route("/books/:id/mark_as_borrowed", patch(books::mark_as_borrowed))
        .route("/books/:id/mark_as_returned", patch(books::mark_as_returned))
        .route("/authors", get(authors::list_authors).post(authors::create_author))
        .route(
            "/authors/:id",
            get(authors::read_author)
                .put(authors::update_author)
                .patch(authors::partial_update_author)
                .delete(authors::delete_author),
        )
        .route("/categories", get(categories::list_categories).post(categories::create_category))
        .route(
            "/categories/:id",
            get(categories::read_category)
                .put(categories::update_category)
                .patch(categories::partial_update_category)
                .delete(categories::delete_category),
        )
        .route("/register", post(auth::register))
        .route("/token", post(auth::obtain_token))
}
