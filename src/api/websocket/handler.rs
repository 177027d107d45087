// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::extract::ws::{Message, WebSocket};
use futures::future;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::debug;

use super::messages::Inbound;
use super::session::{ChatSession, SessionConfig};
use crate::rag::pipeline::ChatPipeline;

/// Run one chat session over an upgraded websocket
pub async fn handle_chat_socket(
    socket: WebSocket,
    pipeline: Arc<ChatPipeline>,
    config: SessionConfig,
) {
    let (sender, receiver) = socket.split();

    let inbound = receiver.map(to_inbound);
    let outbound = sender.with(|text: String| {
        future::ready(Ok::<_, axum::Error>(Message::Text(text)))
    });

    let mut session = ChatSession::new(pipeline, config);
    session.run(inbound, outbound).await;
    debug!(session_id = %session.id(), stats = ?session.stats(), "websocket released");
}

fn to_inbound(frame: Result<Message, axum::Error>) -> Inbound {
    match frame {
        Ok(Message::Text(text)) => Inbound::Text(text),
        Ok(Message::Close(_)) => Inbound::Close,
        // Ping/pong are answered by axum; binary frames are not part of the protocol
        Ok(_) => Inbound::Ignored,
        Err(e) => {
            debug!(error = %e, "websocket receive error");
            Inbound::Close
        }
    }
}
