// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod embeddings;
pub mod memory_store;
pub mod store;

pub use embeddings::{l2_normalize, DistanceMetric, Embedding};
pub use memory_store::InMemoryVectorStore;
pub use store::{EmbeddingEntry, Neighbor, VectorStore};
