//! Customer endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::CustomerId;
use schema::{Customer, CustomerRegistration, CustomerWithOrders};

use crate::auth::Authenticated;
use crate::error::ApiError;
use crate::routes::location;
use crate::state::AppState;

/// GET /customer: 404 when there are no customers at all.
#[tracing::instrument(skip(state))]
pub async fn list(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Customer>>, ApiError> {
    let customers = state.customers.list().await?;
    if customers.is_empty() {
        return Err(ApiError::NotFound("No customer found.".to_string()));
    }
    Ok(Json(customers))
}

/// GET /customer/{id}: the customer with orders and each order's details.
#[tracing::instrument(skip(state, id))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<CustomerWithOrders>, ApiError> {
    let Path(id) = id?;
    state
        .customers
        .get(CustomerId::new(id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Customer with ID {id} not found")))
}

/// POST /customer: registers a customer; the password is stored hashed.
#[tracing::instrument(skip(state, payload))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CustomerRegistration>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(registration) = payload?;
    let customer = state.customers.register(registration).await?;
    Ok((
        StatusCode::CREATED,
        location(format!("/customer/{}", customer.id)),
        Json(customer),
    ))
}

/// DELETE /customer/{id}: refused while orders refer to the customer.
#[tracing::instrument(skip(auth, state, id), fields(subject = %auth.subject()))]
pub async fn delete(
    auth: Authenticated,
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    state.customers.delete(CustomerId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
