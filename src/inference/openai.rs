// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OpenAI-compatible chat completion backend
//!
//! Talks to any server exposing `POST {base_url}/chat/completions` with
//! `stream: true` (LM Studio, llama.cpp server, vLLM, ...). Fragments are
//! decoded from the SSE body as it arrives.

use anyhow::Context;
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::Client;
use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::sse::{SseDecoder, SseEvent};
use super::{FragmentStream, Generator};
use crate::rag::errors::{RagError, RagResult};

pub const DEFAULT_BASE_URL: &str = "http://localhost:1234/v1";
pub const DEFAULT_MODEL: &str = "local-model";

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub connect_timeout: Duration,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            temperature: 0.7,
            max_tokens: None,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

pub struct OpenAiCompatGenerator {
    config: GeneratorConfig,
    client: Client,
    endpoint: String,
}

impl OpenAiCompatGenerator {
    pub fn new(config: GeneratorConfig) -> anyhow::Result<Self> {
        // No overall request timeout: answers stream for as long as the model talks
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .context("Failed to create HTTP client")?;

        let endpoint = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
        info!(endpoint = %endpoint, model = %config.model, "generator configured");

        Ok(Self {
            config,
            client,
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

struct StreamState {
    body: BoxStream<'static, reqwest::Result<Vec<u8>>>,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    finished: bool,
}

impl StreamState {
    fn absorb(&mut self, events: Vec<SseEvent>) {
        for event in events {
            match event {
                SseEvent::Fragment(text) if !self.finished => self.pending.push_back(text),
                SseEvent::Fragment(_) => {}
                SseEvent::Done => self.finished = true,
            }
        }
    }
}

fn fragments(state: StreamState) -> FragmentStream {
    stream::unfold(Some(state), |state| async move {
        let mut state = state?;
        loop {
            if let Some(fragment) = state.pending.pop_front() {
                return Some((Ok(fragment), Some(state)));
            }
            if state.finished {
                return None;
            }
            match state.body.next().await {
                Some(Ok(bytes)) => {
                    let events = state.decoder.push(&bytes);
                    state.absorb(events);
                }
                Some(Err(e)) => {
                    warn!(error = %e, "generation stream interrupted");
                    // Yield the error, then end the stream
                    return Some((
                        Err(RagError::GenerationError(format!(
                            "stream interrupted: {}",
                            e
                        ))),
                        None,
                    ));
                }
                None => {
                    let events = state.decoder.finish();
                    state.absorb(events);
                    state.finished = true;
                }
            }
        }
    })
    .boxed()
}

#[async_trait]
impl Generator for OpenAiCompatGenerator {
    async fn generate(
        &self,
        system_instruction: &str,
        user_question: &str,
    ) -> RagResult<FragmentStream> {
        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_instruction,
                },
                ChatMessage {
                    role: "user",
                    content: user_question,
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            stream: true,
        };

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            RagError::GenerationError(format!("backend unreachable at {}: {}", self.endpoint, e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    debug!(status = %status, error = %e, "failed to read backend error body");
                    String::new()
                }
            };
            return Err(RagError::GenerationError(format!(
                "backend returned {}: {}",
                status, message
            )));
        }

        debug!(model = %self.config.model, "generation stream opened");

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
            .boxed();

        Ok(fragments(StreamState {
            body,
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
            finished: false,
        }))
    }

    fn name(&self) -> &str {
        &self.config.model
    }
}
