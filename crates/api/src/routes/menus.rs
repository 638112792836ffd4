//! Menu endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use schema::{Menu, MenuWithItem, NewMenu};

use crate::error::ApiError;
use crate::state::AppState;

/// GET /menus: every menu together with its item.
#[tracing::instrument(skip(state))]
pub async fn list(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<MenuWithItem>>, ApiError> {
    Ok(Json(state.catalog.list_menus().await?))
}

/// POST /menus: an unknown item is a conflict.
#[tracing::instrument(skip(state, payload))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewMenu>, JsonRejection>,
) -> Result<(StatusCode, Json<Menu>), ApiError> {
    let Json(menu) = payload?;
    let menu = state.catalog.create_menu(menu).await?;
    Ok((StatusCode::CREATED, Json(menu)))
}
