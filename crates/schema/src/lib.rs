//! Schema layer for the store backend.
//!
//! This crate declares the persisted entities and everything the gateway needs
//! to protect them:
//! - entity structs and their write models (`New*`)
//! - field constraints through the [`Validate`] trait
//! - the relationship table with per-relationship [`DeletePolicy`]
//! - forward-only read models used for eager fetches

pub mod customer;
pub mod error;
pub mod item;
pub mod kind;
pub mod order;
pub mod record;
pub mod relationships;
pub mod validate;

pub use common::{CustomerId, ItemId, MenuId, Money, OrderDetailId, OrderId};
pub use customer::{Customer, CustomerRegistration, CustomerWithOrders, NewCustomer};
pub use error::{ValidationError, ValidationReason};
pub use item::{Item, ItemWithMenus, Menu, MenuWithItem, NewItem, NewMenu};
pub use kind::EntityKind;
pub use order::{NewOrder, NewOrderDetail, Order, OrderDetail, OrderWithDetails};
pub use record::{Record, Reference};
pub use relationships::{DeletePolicy, RELATIONSHIPS, Relationship};
pub use validate::Validate;
