// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// In-memory vector storage for menu embeddings
// Exact linear scan; catalog scale is tens to low thousands of entries

use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::embeddings::{DistanceMetric, Embedding};
use super::store::{EmbeddingEntry, Neighbor, VectorStore};
use crate::rag::errors::{RagError, RagResult};

/// Stored entry plus its insertion sequence number (tie-breaker)
#[derive(Debug, Clone)]
struct Slot {
    seq: u64,
    entry: Arc<EmbeddingEntry>,
}

#[derive(Debug, Default)]
struct Inner {
    slots: HashMap<Uuid, Slot>,
    next_seq: u64,
}

/// Process-wide vector store shared by every chat session and the
/// index synchronizer
/// - Entries are replaced as a whole under the write lock, so readers
///   never observe a vector from one write and a chunk from another
/// - tokio's `RwLock` is fair: queued writers are not starved by readers
#[derive(Debug)]
pub struct InMemoryVectorStore {
    dimension: usize,
    metric: DistanceMetric,
    inner: RwLock<Inner>,
}

impl InMemoryVectorStore {
    /// Create an empty store for `dimension`-length vectors
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            metric: DistanceMetric::Cosine,
            inner: RwLock::new(Inner::default()),
        }
    }

    fn check_dimension(&self, actual: usize) -> RagResult<()> {
        if actual != self.dimension {
            return Err(RagError::DimensionMismatch {
                expected: self.dimension,
                actual,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn upsert(
        &self,
        record_id: Uuid,
        vector: Vec<f32>,
        content_chunk: String,
    ) -> RagResult<()> {
        self.check_dimension(vector.len())?;

        // NaN or Infinity would poison every distance computed against it
        if !Embedding::new(&vector).is_finite() {
            return Err(RagError::InvalidInput(
                "vector contains NaN or Infinity (all values must be finite numbers)".to_string(),
            ));
        }

        let entry = Arc::new(EmbeddingEntry {
            record_id,
            vector,
            content_chunk,
        });

        let mut inner = self.inner.write().await;
        // Replacing keeps the original insertion position
        let seq = match inner.slots.get(&record_id) {
            Some(existing) => existing.seq,
            None => {
                let seq = inner.next_seq;
                inner.next_seq += 1;
                seq
            }
        };
        inner.slots.insert(record_id, Slot { seq, entry });

        debug!(record_id = %record_id, entries = inner.slots.len(), "vector entry upserted");
        Ok(())
    }

    async fn delete(&self, record_id: Uuid) -> RagResult<bool> {
        let mut inner = self.inner.write().await;
        let removed = inner.slots.remove(&record_id).is_some();
        if removed {
            debug!(record_id = %record_id, entries = inner.slots.len(), "vector entry deleted");
        }
        Ok(removed)
    }

    async fn nearest(&self, query: &[f32], k: usize) -> RagResult<Vec<Neighbor>> {
        self.check_dimension(query.len())?;

        // Snapshot the Arc'd entries, then score without holding the lock
        let slots: Vec<Slot> = {
            let inner = self.inner.read().await;
            inner.slots.values().cloned().collect()
        };

        if slots.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(f32, u64, Arc<EmbeddingEntry>)> = slots
            .into_iter()
            .map(|slot| {
                let distance = self.metric.distance(query, &slot.entry.vector);
                (distance, slot.seq, slot.entry)
            })
            .collect();

        scored.sort_by(|a, b| match a.0.total_cmp(&b.0) {
            Ordering::Equal => a.1.cmp(&b.1),
            other => other,
        });
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(distance, _, entry)| Neighbor {
                record_id: entry.record_id,
                distance,
                content_chunk: entry.content_chunk.clone(),
            })
            .collect())
    }

    async fn get(&self, record_id: Uuid) -> Option<EmbeddingEntry> {
        let inner = self.inner.read().await;
        inner
            .slots
            .get(&record_id)
            .map(|slot| slot.entry.as_ref().clone())
    }

    async fn record_ids(&self) -> Vec<Uuid> {
        let inner = self.inner.read().await;
        let mut ids: Vec<(u64, Uuid)> = inner
            .slots
            .iter()
            .map(|(id, slot)| (slot.seq, *id))
            .collect();
        ids.sort_by_key(|(seq, _)| *seq);
        ids.into_iter().map(|(_, id)| id).collect()
    }

    async fn len(&self) -> usize {
        self.inner.read().await.slots.len()
    }
}
