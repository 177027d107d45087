// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod openai;
pub mod sse;

use async_trait::async_trait;
use futures::stream::Stream;
use std::pin::Pin;

use crate::rag::errors::RagResult;

pub use openai::{GeneratorConfig, OpenAiCompatGenerator};
pub use sse::{SseDecoder, SseEvent};

/// Lazily produced answer fragments, in generation order
///
/// Dropping the stream cancels the generation and releases the backend
/// connection.
pub type FragmentStream = Pin<Box<dyn Stream<Item = RagResult<String>> + Send>>;

/// Text-generation backend
///
/// Each call produces one fresh, finite answer stream. Fails with
/// `GenerationError` when the backend cannot be reached.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(
        &self,
        system_instruction: &str,
        user_question: &str,
    ) -> RagResult<FragmentStream>;

    /// Backend name for logging
    fn name(&self) -> &str;
}
