// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Menu CRUD endpoints
//!
//! Each mutating call returns only after the index has been updated, or
//! fails with the encoder error and leaves the menu untouched.

use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};
use uuid::Uuid;

use super::errors::ApiError;
use super::server::AppState;
use crate::catalog::{MenuItem, MenuItemInput};

pub async fn list_menu(State(state): State<AppState>) -> Json<Vec<MenuItem>> {
    Json(state.catalog.list().await)
}

pub async fn create_menu_item(
    State(state): State<AppState>,
    Json(input): Json<MenuItemInput>,
) -> Result<Json<MenuItem>, ApiError> {
    let item = state.catalog.create(input).await?;
    Ok(Json(item))
}

pub async fn update_menu_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<MenuItemInput>,
) -> Result<Json<MenuItem>, ApiError> {
    let item = state.catalog.update(id, input).await?;
    Ok(Json(item))
}

/// Always reports success; deleting an unknown id is a no-op
pub async fn delete_menu_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    state.catalog.delete(id).await?;
    Ok(Json(json!({ "status": "success" })))
}
