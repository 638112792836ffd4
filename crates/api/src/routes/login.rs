//! Login endpoint issuing bearer tokens.

use std::sync::Arc;

use access::IssuedToken;
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// POST /login: checks the credentials and issues a token for the
/// customer's email.
#[tracing::instrument(skip(state, payload))]
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<IssuedToken>, ApiError> {
    let Json(request) = payload?;
    let customer = state
        .customers
        .authenticate(&request.email, &request.password)
        .await?;
    let issued = state.authority.issue(&customer.email)?;
    tracing::info!(customer_id = %customer.id, token_id = %issued.token_id, "login succeeded");
    Ok(Json(issued))
}
