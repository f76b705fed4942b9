//! Catalog and auth records as stored and as serialized to clients.

pub mod author;
pub mod book;
pub mod category;
pub mod user;

pub use author::Author;
pub use book::{Book, BookOut, BookStatus, LendingAction, TransitionError};
pub use category::Category;
pub use user::{AuthToken, User, UserOut};
