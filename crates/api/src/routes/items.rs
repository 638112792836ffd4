//! Item endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::ItemId;
use schema::{ItemWithMenus, NewItem};

use crate::auth::Authenticated;
use crate::error::ApiError;
use crate::routes::location;
use crate::state::AppState;

/// GET /items: every item with its menus.
#[tracing::instrument(skip(state))]
pub async fn list(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ItemWithMenus>>, ApiError> {
    Ok(Json(state.catalog.list_items().await?))
}

/// GET /items/{id}
#[tracing::instrument(skip(state, id))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<ItemWithMenus>, ApiError> {
    let Path(id) = id?;
    state
        .catalog
        .get_item(ItemId::new(id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Item with ID {id} not found")))
}

/// POST /items
#[tracing::instrument(skip(state, payload))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewItem>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(item) = payload?;
    let item = state.catalog.create_item(item).await?;
    Ok((
        StatusCode::CREATED,
        location(format!("/items/{}", item.id)),
        Json(item),
    ))
}

/// DELETE /items/{id}: refused while menus or order details refer to it.
#[tracing::instrument(skip(auth, state, id), fields(subject = %auth.subject()))]
pub async fn delete(
    auth: Authenticated,
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    state.catalog.delete_item(ItemId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
