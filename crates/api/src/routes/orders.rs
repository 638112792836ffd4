//! Order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::OrderId;
use ordering::PlaceOrder;
use schema::{NewOrder, Order, OrderWithDetails};

use crate::auth::Authenticated;
use crate::error::ApiError;
use crate::routes::location;
use crate::state::AppState;

/// GET /orders: 404 when there are no orders at all.
#[tracing::instrument(skip(state))]
pub async fn list(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<OrderWithDetails>>, ApiError> {
    let orders = state.orders.list_orders().await?;
    if orders.is_empty() {
        return Err(ApiError::NotFound("No order found.".to_string()));
    }
    Ok(Json(orders))
}

/// GET /orders/{id}: the order with its details.
#[tracing::instrument(skip(state, id))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<OrderWithDetails>, ApiError> {
    let Path(id) = id?;
    state
        .orders
        .get_order(OrderId::new(id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Order with ID {id} not found")))
}

/// POST /orders: places the order and all of its details atomically.
#[tracing::instrument(skip(auth, state, payload), fields(subject = %auth.subject()))]
pub async fn create(
    auth: Authenticated,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PlaceOrder>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let placed = state.orders.place_order(request).await?;
    Ok((
        StatusCode::CREATED,
        location(format!("/orders/{}", placed.order.id)),
        Json(placed),
    ))
}

/// PUT /orders/{id}: overwrites the order header.
#[tracing::instrument(skip(auth, state, id, payload), fields(subject = %auth.subject()))]
pub async fn update(
    auth: Authenticated,
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<NewOrder>, JsonRejection>,
) -> Result<Json<Order>, ApiError> {
    let Path(id) = id?;
    let Json(changes) = payload?;
    let order = state.orders.update_order(OrderId::new(id), changes).await?;
    Ok(Json(order))
}

/// DELETE /orders/{id}: removes the order and its details.
#[tracing::instrument(skip(auth, state, id), fields(subject = %auth.subject()))]
pub async fn delete(
    auth: Authenticated,
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    state.orders.delete_order(OrderId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
