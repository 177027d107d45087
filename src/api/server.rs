// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use axum::{
    extract::{ws::WebSocketUpgrade, State},
    response::IntoResponse,
    routing::{get, put},
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::handlers::{health_handler, root_handler};
use super::menu::{create_menu_item, delete_menu_item, list_menu, update_menu_item};
use super::websocket::{handle_chat_socket, SessionConfig};
use crate::catalog::MenuCatalog;
use crate::rag::pipeline::ChatPipeline;
use crate::vector::VectorStore;

/// Shared handles for every request and chat session
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<MenuCatalog>,
    pub pipeline: Arc<ChatPipeline>,
    pub store: Arc<dyn VectorStore>,
    pub encoder_name: Arc<str>,
    pub session_config: SessionConfig,
}

impl AppState {
    pub fn new(
        catalog: Arc<MenuCatalog>,
        pipeline: Arc<ChatPipeline>,
        session_config: SessionConfig,
    ) -> Self {
        let synchronizer = catalog.synchronizer();
        Self {
            store: synchronizer.store().clone(),
            encoder_name: Arc::from(synchronizer.encoder().name()),
            catalog,
            pipeline,
            session_config,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/menu", get(list_menu).post(create_menu_item))
        .route("/menu/", get(list_menu).post(create_menu_item))
        .route("/menu/:id", put(update_menu_item).delete(delete_menu_item))
        .route("/ws/chat", get(chat_socket_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn chat_socket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let pipeline = state.pipeline.clone();
    let config = state.session_config;
    ws.on_upgrade(move |socket| handle_chat_socket(socket, pipeline, config))
}

/// Bind `addr` and serve until `shutdown` resolves
pub async fn serve<F>(addr: SocketAddr, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "smart menu API listening");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("smart menu API stopped");
    Ok(())
}
