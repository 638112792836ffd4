//! Application services for the store backend.
//!
//! This crate provides:
//! - [`OrderService`], which places an order and its line details as one
//!   atomic unit of work
//! - [`CustomerService`] for registration and credential checks
//! - [`CatalogService`] for items and their menus

pub mod catalog;
pub mod customer;
pub mod error;
pub mod order;
pub mod request;

pub use catalog::CatalogService;
pub use customer::CustomerService;
pub use error::ServiceError;
pub use order::OrderService;
pub use request::{LineItem, PlaceOrder};
