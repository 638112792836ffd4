//! Order placement and maintenance.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use common::OrderId;
use schema::{EntityKind, NewOrder, Order, OrderWithDetails};
use store::{Store, StoreError, run_in_transaction};

use crate::error::ServiceError;
use crate::request::PlaceOrder;

/// Service for placing and managing orders.
///
/// Every write runs as a single store transaction, so an order header is
/// never visible without all of its details.
pub struct OrderService<S: Store + ?Sized> {
    store: Arc<S>,
}

impl<S: Store + ?Sized> Clone for OrderService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: Store + ?Sized> OrderService<S> {
    /// Creates a new order service over the given store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Places an order with its line items.
    ///
    /// The customer is resolved inside the same transaction that writes the
    /// order, so either the header and every detail become visible together
    /// or nothing is written. Each detail inherits the order's customer.
    #[tracing::instrument(
        skip(self, request),
        fields(customer_id = %request.customer_id, lines = request.order_details.len())
    )]
    pub async fn place_order(&self, request: PlaceOrder) -> Result<OrderWithDetails, ServiceError> {
        let customer_id = request.customer_id;
        let start = Instant::now();

        let result: Result<OrderWithDetails, ServiceError> =
            run_in_transaction(self.store.as_ref(), move |tx| {
                Box::pin(async move {
                    if !tx.exists(EntityKind::Customer, customer_id.as_i64()).await? {
                        return Err(ServiceError::CustomerNotFound(customer_id));
                    }

                    let (header, lines) = request.into_parts(Utc::now());
                    let order = tx.create_order(header).await?;

                    let mut order_details = Vec::with_capacity(lines.len());
                    for line in lines {
                        let detail = tx
                            .create_order_detail(line.into_detail(order.id, customer_id))
                            .await?;
                        order_details.push(detail);
                    }

                    Ok::<_, ServiceError>(OrderWithDetails {
                        order,
                        order_details,
                    })
                })
            })
            .await;

        metrics::histogram!("order_placement_duration_seconds")
            .record(start.elapsed().as_secs_f64());
        match &result {
            Ok(placed) => {
                metrics::counter!("orders_placed_total").increment(1);
                tracing::info!(
                    order_id = %placed.order.id,
                    details = placed.order_details.len(),
                    "order placed"
                );
            }
            Err(err) => {
                metrics::counter!("orders_rejected_total").increment(1);
                tracing::warn!(error = %err, "order rejected");
            }
        }

        result
    }

    /// Overwrites the header fields of an existing order. Details are left
    /// untouched.
    #[tracing::instrument(skip(self, changes))]
    pub async fn update_order(
        &self,
        order_id: OrderId,
        changes: NewOrder,
    ) -> Result<Order, ServiceError> {
        run_in_transaction(self.store.as_ref(), move |tx| {
            Box::pin(async move {
                if !tx.exists(EntityKind::Order, order_id.as_i64()).await? {
                    return Err(StoreError::not_found(EntityKind::Order, order_id).into());
                }
                let customer_id = changes.customer_id;
                if !tx.exists(EntityKind::Customer, customer_id.as_i64()).await? {
                    return Err(ServiceError::CustomerNotFound(customer_id));
                }
                Ok::<_, ServiceError>(tx.update_order(order_id, changes).await?)
            })
        })
        .await
    }

    /// Loads an order with its details.
    ///
    /// Returns None if the order doesn't exist.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(
        &self,
        order_id: OrderId,
    ) -> Result<Option<OrderWithDetails>, ServiceError> {
        Ok(self.store.find_order(order_id).await?)
    }

    /// Lists every order with its details, oldest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self) -> Result<Vec<OrderWithDetails>, ServiceError> {
        Ok(self.store.list_orders().await?)
    }

    /// Deletes an order and, by cascade, all of its details. Returns the
    /// number of rows removed.
    #[tracing::instrument(skip(self))]
    pub async fn delete_order(&self, order_id: OrderId) -> Result<u64, ServiceError> {
        let removed = run_in_transaction(self.store.as_ref(), move |tx| {
            Box::pin(async move {
                Ok::<_, ServiceError>(tx.delete(EntityKind::Order, order_id.as_i64()).await?)
            })
        })
        .await?;
        tracing::info!(%order_id, removed, "order deleted");
        Ok(removed)
    }
}
