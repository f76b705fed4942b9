//! OpenAPI document served at `/openapi.json`.

use crate::handlers::{auth, authors, books, categories};
use crate::models::{Author, BookOut, BookStatus, Category, UserOut};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(title = "Bookstore API", description = "Books, authors and categories with token-authenticated writes"),
    paths(
        books::list_books,
        books::create_book,
        books::read_book,
        books::update_book,
        books::partial_update_book,
        books::delete_book,
        books::available_books,
        books::books_by_author,
        books::mark_as_borrowed,
        books::mark_as_returned,
        authors::list_authors,
        authors::create_author,
        authors::read_author,
        authors::update_author,
        authors::partial_update_author,
        authors::delete_author,
        categories::list_categories,
        categories::create_category,
        categories::read_category,
        categories::update_category,
        categories::partial_update_category,
        categories::delete_category,
        auth::register,
        auth::obtain_token,
    ),
    components(schemas(BookOut, BookStatus, Author, Category, UserOut, auth::Registered, auth::TokenBody)),
    modifiers(&TokenSecurity),
    tags(
        (name = "books", description = "Book catalog and lending actions"),
        (name = "authors", description = "Authors"),
        (name = "categories", description = "Categories"),
        (name = "auth", description = "Registration and token exchange")
    )
)]
pub struct ApiDoc;

/// `Authorization: Token <key>` scheme referenced by write operations.
struct TokenSecurity;

impl Modify for TokenSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "token",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                    "Authorization",
                    "Token <key>",
                ))),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_resource_path() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/v1/books/",
            "/api/v1/books/{id}/",
            "/api/v1/books/available/",
            "/api/v1/books/by_author/",
            "/api/v1/books/{id}/mark_as_borrowed/",
            "/api/v1/books/{id}/mark_as_returned/",
            "/api/v1/authors/{id}/",
            "/api/v1/categories/",
            "/api/v1/register/",
            "/api/v1/token/",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{} missing", path);
        }
        let json = serde_json::to_value(&doc).unwrap();
        assert!(json["components"]["securitySchemes"].get("token").is_some());
    }
}
