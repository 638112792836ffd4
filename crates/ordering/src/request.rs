//! Inbound order placement request.

use chrono::{DateTime, Utc};
use common::{CustomerId, ItemId, Money, OrderId};
use schema::{NewOrder, NewOrderDetail};
use serde::Deserialize;

/// An order header plus its line items, placed as one unit.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrder {
    pub customer_id: CustomerId,
    /// Defaults to the time of placement.
    #[serde(default)]
    pub order_date_time: Option<DateTime<Utc>>,
    pub total_amount: Money,
    pub payment_status: String,
    pub delivery_status: String,
    #[serde(default, alias = "details")]
    pub order_details: Vec<LineItem>,
}

/// One requested line. The owning order and customer are filled in by the
/// workflow, never by the caller.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub item_id: ItemId,
    pub size: String,
    pub quantity: i32,
    pub price_per_piece: Money,
}

impl PlaceOrder {
    pub fn new(
        customer_id: CustomerId,
        total_amount: Money,
        payment_status: impl Into<String>,
        delivery_status: impl Into<String>,
    ) -> Self {
        Self {
            customer_id,
            order_date_time: None,
            total_amount,
            payment_status: payment_status.into(),
            delivery_status: delivery_status.into(),
            order_details: Vec::new(),
        }
    }

    pub fn with_line(mut self, line: LineItem) -> Self {
        self.order_details.push(line);
        self
    }

    /// Splits the request into the order header and its lines, stamping the
    /// header with `now` when no date was supplied.
    pub fn into_parts(self, now: DateTime<Utc>) -> (NewOrder, Vec<LineItem>) {
        let header = NewOrder {
            customer_id: self.customer_id,
            order_date_time: self.order_date_time.unwrap_or(now),
            total_amount: self.total_amount,
            payment_status: self.payment_status,
            delivery_status: self.delivery_status,
        };
        (header, self.order_details)
    }
}

impl LineItem {
    pub fn new(item_id: ItemId, size: impl Into<String>, quantity: i32, price: Money) -> Self {
        Self {
            item_id,
            size: size.into(),
            quantity,
            price_per_piece: price,
        }
    }

    pub fn into_detail(self, order_id: OrderId, customer_id: CustomerId) -> NewOrderDetail {
        NewOrderDetail {
            order_id,
            customer_id,
            item_id: self.item_id,
            size: self.size,
            quantity: self.quantity,
            price_per_piece: self.price_per_piece,
        }
    }
}
