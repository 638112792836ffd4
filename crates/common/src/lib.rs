//! Shared types used across the store backend crates.

pub mod ids;
pub mod money;

pub use ids::{CustomerId, ItemId, MenuId, OrderDetailId, OrderId};
pub use money::{Money, MoneyError};
