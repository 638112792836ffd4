//! Route handlers, one module per resource.

pub mod customers;
pub mod items;
pub mod login;
pub mod menus;
pub mod orders;
pub mod system;

use axum::http::{HeaderName, header};

/// `Location` header pointing at a newly created resource.
pub(crate) fn location(path: String) -> [(HeaderName, String); 1] {
    [(header::LOCATION, path)]
}
