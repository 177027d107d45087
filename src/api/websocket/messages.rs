// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sent once after the last fragment of every answer
pub const DONE_MARKER: &str = "[DONE]";

/// Client → server payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub question: String,
}

/// Transport-neutral view of one inbound frame
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Text(String),
    /// Peer closed or the transport failed
    Close,
    /// Frames with no meaning for the chat protocol (ping, binary, ...)
    Ignored,
}

/// Extract a usable question from a text frame
///
/// Only a JSON object with a string `question` counts; malformed JSON,
/// other shapes, a missing field or a blank question give `None`.
pub fn parse_question(text: &str) -> Option<String> {
    let value: Value = serde_json::from_str(text).ok()?;
    let question = value.as_object()?.get("question")?.as_str()?.trim();
    if question.is_empty() {
        None
    } else {
        Some(question.to_string())
    }
}
