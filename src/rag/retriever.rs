// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::sync::Arc;
use tracing::debug;

use super::errors::{RagError, RagResult};
use crate::embeddings::Encoder;
use crate::vector::VectorStore;

/// Number of chunks handed to the generator per question
pub const DEFAULT_TOP_K: usize = 3;

/// Chunks retrieved for one question, closest first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievalContext {
    chunks: Vec<String>,
}

impl RetrievalContext {
    pub fn new(chunks: Vec<String>) -> Self {
        Self { chunks }
    }

    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Newline-joined presentation used inside the prompt
    pub fn joined(&self) -> String {
        self.chunks.join("\n")
    }
}

/// Encodes a question and looks up the closest menu chunks
pub struct Retriever {
    encoder: Arc<dyn Encoder>,
    store: Arc<dyn VectorStore>,
    top_k: usize,
}

impl Retriever {
    pub fn new(encoder: Arc<dyn Encoder>, store: Arc<dyn VectorStore>) -> Self {
        Self {
            encoder,
            store,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub async fn retrieve(&self, question: &str) -> RagResult<RetrievalContext> {
        self.retrieve_k(question, self.top_k).await
    }

    /// Retrieve up to `k` chunks for `question`
    ///
    /// Blank questions are rejected with `InvalidInput` before the encoder
    /// is called. An empty store yields an empty context, not an error.
    pub async fn retrieve_k(&self, question: &str, k: usize) -> RagResult<RetrievalContext> {
        if question.trim().is_empty() {
            return Err(RagError::InvalidInput("question is empty".to_string()));
        }

        let query = self.encoder.embed(question).await?;
        let neighbors = self.store.nearest(&query, k).await?;

        debug!(
            k = k,
            matched = neighbors.len(),
            closest = neighbors.first().map(|n| n.distance),
            "retrieval complete"
        );

        Ok(RetrievalContext::new(
            neighbors.into_iter().map(|n| n.content_chunk).collect(),
        ))
    }
}
