// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vector store contract
//!
//! One embedding entry per catalog record, queried by nearest neighbour.
//! Callers only see this trait so the exact linear scan behind
//! [`InMemoryVectorStore`](super::InMemoryVectorStore) can be replaced by
//! an approximate index later.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::rag::errors::RagResult;

/// Stored embedding for one catalog record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingEntry {
    pub record_id: Uuid,
    pub vector: Vec<f32>,
    /// Exact text that was encoded to produce `vector`
    pub content_chunk: String,
}

/// Result row of a nearest-neighbour query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub record_id: Uuid,
    /// Cosine distance to the query, `1 - cosine_similarity`
    pub distance: f32,
    pub content_chunk: String,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Fixed dimensionality every stored and queried vector must have
    fn dimension(&self) -> usize;

    /// Insert or atomically replace the entry for `record_id`
    ///
    /// Fails with `DimensionMismatch` when `vector.len() != dimension()`.
    async fn upsert(&self, record_id: Uuid, vector: Vec<f32>, content_chunk: String)
        -> RagResult<()>;

    /// Remove the entry for `record_id`; returns whether one existed
    async fn delete(&self, record_id: Uuid) -> RagResult<bool>;

    /// Up to `k` entries by ascending distance, ties in insertion order
    async fn nearest(&self, query: &[f32], k: usize) -> RagResult<Vec<Neighbor>>;

    async fn get(&self, record_id: Uuid) -> Option<EmbeddingEntry>;

    async fn record_ids(&self) -> Vec<Uuid>;

    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
