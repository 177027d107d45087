// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Incremental decoder for OpenAI-style `text/event-stream` bodies
//!
//! Network chunks may split a line, or a UTF-8 sequence, anywhere. The
//! decoder buffers raw bytes and only decodes complete lines.

use serde::Deserialize;
use tracing::debug;

/// Terminal marker sent by OpenAI-compatible servers
const DONE_MARKER: &str = "[DONE]";

#[derive(Debug, Clone, PartialEq)]
pub enum SseEvent {
    /// Non-empty content delta
    Fragment(String),
    /// Server sent `data: [DONE]`
    Done,
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Option<ChunkDelta>,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes; returns the events completed by them
    pub fn push(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(event) = Self::decode_line(&line) {
                events.push(event);
            }
        }
        events
    }

    /// Flush a trailing line that had no newline
    pub fn finish(&mut self) -> Vec<SseEvent> {
        if self.buffer.is_empty() {
            return Vec::new();
        }
        let line = std::mem::take(&mut self.buffer);
        Self::decode_line(&line).into_iter().collect()
    }

    fn decode_line(raw: &[u8]) -> Option<SseEvent> {
        let line = String::from_utf8_lossy(raw);
        let line = line.trim_end_matches(['\r', '\n']);

        // Comments, event names and blank separators carry no content
        let data = line.strip_prefix("data:")?.trim_start();
        if data == DONE_MARKER {
            return Some(SseEvent::Done);
        }

        match serde_json::from_str::<ChatChunk>(data) {
            Ok(chunk) => chunk
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.delta)
                .and_then(|delta| delta.content)
                .filter(|content| !content.is_empty())
                .map(SseEvent::Fragment),
            Err(e) => {
                debug!(error = %e, "skipping undecodable stream line");
                None
            }
        }
    }
}
