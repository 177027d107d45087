// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Text encoders
//!
//! The pipeline only sees [`Encoder`]. A single encoder handle is built
//! once at startup and shared as `Arc<dyn Encoder>` by the retriever and
//! the index synchronizer; it is dropped at shutdown with the server.

pub mod hashing;
pub mod onnx_model;

use async_trait::async_trait;

use crate::rag::errors::RagResult;

pub use hashing::HashingEncoder;
pub use onnx_model::OnnxEncoder;

/// Turns text into a fixed-length vector
///
/// Implementations must be deterministic for identical input and must
/// reject empty text with `EncodingError`.
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Length of every vector this encoder produces
    fn dimension(&self) -> usize;

    /// Model name for logging
    fn name(&self) -> &str;

    async fn embed(&self, text: &str) -> RagResult<Vec<f32>>;
}
