//! API handlers

use axum::{
    extract::{Path, State},
    Json,
};
use futures::TryStreamExt;
use serde::Serialize;

use crate::api::{ApiError, ApiJson, AppState};
use crate::types::Item;

/// Health check
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        collection: state.repository.collection().to_string(),
    })
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub collection: String,
}

/// Create an item with a generated id
pub async fn create_item(
    State(state): State<AppState>,
    ApiJson(item): ApiJson<Item>,
) -> Result<Json<Item>, ApiError> {
    let item = state
        .repository
        .create(item)
        .await
        .map_err(|e| state.reject(e))?;

    tracing::info!(id = %item.id, "Item created");
    Ok(Json(item))
}

/// List every item in the collection
pub async fn list_items(State(state): State<AppState>) -> Result<Json<Vec<Item>>, ApiError> {
    let items: Vec<Item> = state
        .repository
        .get_all()
        .await
        .map_err(|e| state.reject(e))?
        .try_collect()
        .await
        .map_err(|e| state.reject(e))?;

    Ok(Json(items))
}

/// Fetch a single item
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Item>, ApiError> {
    let item = state
        .repository
        .get(&id)
        .await
        .map_err(|e| state.reject(e))?;

    Ok(Json(item))
}

/// Replace the item stored under `id`, creating it when missing
pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(item): ApiJson<Item>,
) -> Result<Json<Item>, ApiError> {
    let item = state
        .repository
        .update(&id, item)
        .await
        .map_err(|e| state.reject(e))?;

    tracing::info!(id = %item.id, "Item updated");
    Ok(Json(item))
}

/// Delete an item; deleting a missing item succeeds
pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    state
        .repository
        .delete(&id)
        .await
        .map_err(|e| state.reject(e))?;

    tracing::info!(%id, "Item deleted");
    Ok(Json(DeleteResponse {
        message: format!("item {} deleted", id),
    }))
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub message: String,
}
