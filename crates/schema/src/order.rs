//! Orders and their line details.

use chrono::{DateTime, Utc};
use common::{CustomerId, ItemId, Money, OrderDetailId, OrderId};
use serde::{Deserialize, Serialize};

use crate::validate::required;
use crate::{EntityKind, Record, Validate, ValidationError};

pub const ORDER_STATUS_MAX: usize = 50;
pub const DETAIL_SIZE_MAX: usize = 25;

/// An order header.
///
/// The customer is referenced by key only; details are attached through
/// [`OrderWithDetails`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub order_date_time: DateTime<Utc>,
    pub total_amount: Money,
    pub payment_status: String,
    pub delivery_status: String,
}

/// Mutable fields of an order, used for both create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub customer_id: CustomerId,
    pub order_date_time: DateTime<Utc>,
    pub total_amount: Money,
    pub payment_status: String,
    pub delivery_status: String,
}

impl NewOrder {
    pub fn into_order(self, id: OrderId) -> Order {
        Order {
            id,
            customer_id: self.customer_id,
            order_date_time: self.order_date_time,
            total_amount: self.total_amount,
            payment_status: self.payment_status,
            delivery_status: self.delivery_status,
        }
    }
}

impl Validate for NewOrder {
    fn validate(&self) -> Result<(), ValidationError> {
        required(
            "Order",
            "paymentStatus",
            &self.payment_status,
            ORDER_STATUS_MAX,
        )?;
        required(
            "Order",
            "deliveryStatus",
            &self.delivery_status,
            ORDER_STATUS_MAX,
        )
    }
}

impl Record for NewOrder {
    const KIND: EntityKind = EntityKind::Order;

    fn column_value(&self, column: &str) -> Option<i64> {
        match column {
            "customer_id" => Some(self.customer_id.as_i64()),
            _ => None,
        }
    }
}

/// One line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    pub id: OrderDetailId,
    pub order_id: OrderId,
    pub customer_id: CustomerId,
    pub item_id: ItemId,
    pub size: String,
    pub quantity: i32,
    pub price_per_piece: Money,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderDetail {
    pub order_id: OrderId,
    pub customer_id: CustomerId,
    pub item_id: ItemId,
    pub size: String,
    pub quantity: i32,
    pub price_per_piece: Money,
}

impl NewOrderDetail {
    pub fn into_detail(self, id: OrderDetailId) -> OrderDetail {
        OrderDetail {
            id,
            order_id: self.order_id,
            customer_id: self.customer_id,
            item_id: self.item_id,
            size: self.size,
            quantity: self.quantity,
            price_per_piece: self.price_per_piece,
        }
    }
}

impl Validate for NewOrderDetail {
    fn validate(&self) -> Result<(), ValidationError> {
        required("OrderDetail", "size", &self.size, DETAIL_SIZE_MAX)
    }
}

impl Record for NewOrderDetail {
    const KIND: EntityKind = EntityKind::OrderDetail;

    fn column_value(&self, column: &str) -> Option<i64> {
        match column {
            "order_id" => Some(self.order_id.as_i64()),
            "customer_id" => Some(self.customer_id.as_i64()),
            "item_id" => Some(self.item_id.as_i64()),
            _ => None,
        }
    }
}

/// An order with its details, the unit placed and read as one aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderWithDetails {
    #[serde(flatten)]
    pub order: Order,
    pub order_details: Vec<OrderDetail>,
}
