// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::server::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WelcomeResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub menu_items: usize,
    pub indexed_entries: usize,
    pub encoder: String,
    pub embedding_dimension: usize,
}

pub async fn root_handler() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: "Welcome to Smart Menu API".to_string(),
    })
}

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let menu_items = state.catalog.len().await;
    let indexed_entries = state.store.len().await;

    // Drift between the two counts is repaired by the next reconcile pass
    let status = if menu_items == indexed_entries {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: crate::version::VERSION.to_string(),
        menu_items,
        indexed_entries,
        encoder: state.encoder_name.to_string(),
        embedding_dimension: state.store.dimension(),
    })
}
