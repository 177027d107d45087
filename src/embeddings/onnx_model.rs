// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! ONNX sentence encoder
//!
//! Runs the all-MiniLM-L6-v2 sentence transformer through ONNX Runtime:
//! - BERT tokenization, truncated to 256 tokens
//! - Mean pooling over token embeddings, weighted by the attention mask
//! - L2 normalisation so cosine distance behaves on the stored vectors
//! - Inference runs on the blocking pool so sessions keep yielding

use anyhow::{Context, Result};
use async_trait::async_trait;
use ndarray::{Array2, Axis};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokenizers::Tokenizer;
use tracing::{debug, info};

use super::Encoder;
use crate::rag::errors::{RagError, RagResult};
use crate::vector::l2_normalize;

/// Output width of all-MiniLM-L6-v2
pub const MINILM_DIMENSION: usize = 384;

const MAX_SEQUENCE_LENGTH: usize = 256;

/// ONNX-based encoder (all-MiniLM-L6-v2)
///
/// Cheap to clone; the runtime session sits behind `Arc<Mutex<_>>`
/// because `Session::run` needs exclusive access.
#[derive(Clone)]
pub struct OnnxEncoder {
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
    model_name: String,
    dimension: usize,
}

impl std::fmt::Debug for OnnxEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxEncoder")
            .field("model_name", &self.model_name)
            .field("dimension", &self.dimension)
            .finish_non_exhaustive()
    }
}

impl OnnxEncoder {
    /// Load the model and tokenizer from disk and probe the output width
    ///
    /// # Errors
    /// Returns error if either file is missing or invalid, or the model
    /// does not produce `[batch, seq_len, 384]` token embeddings.
    pub async fn new<P: AsRef<Path>>(
        model_name: impl Into<String>,
        model_path: P,
        tokenizer_path: P,
    ) -> Result<Self> {
        let model_name = model_name.into();
        let model_path = model_path.as_ref().to_path_buf();
        let tokenizer_path = tokenizer_path.as_ref().to_path_buf();

        if !model_path.exists() {
            anyhow::bail!("ONNX model file not found: {}", model_path.display());
        }
        if !tokenizer_path.exists() {
            anyhow::bail!("Tokenizer file not found: {}", tokenizer_path.display());
        }

        info!(model = %model_name, path = %model_path.display(), "loading ONNX encoder");

        let (session, tokenizer) = tokio::task::spawn_blocking(move || -> Result<_> {
            let session = Session::builder()
                .context("Failed to create session builder")?
                .with_execution_providers([CPUExecutionProvider::default().build()])
                .context("Failed to set CPU execution provider")?
                .with_optimization_level(GraphOptimizationLevel::Level3)
                .context("Failed to set optimization level")?
                .with_intra_threads(4)
                .context("Failed to set intra threads")?
                .commit_from_file(&model_path)
                .with_context(|| format!("Failed to load ONNX model from {}", model_path.display()))?;

            let tokenizer = Tokenizer::from_file(&tokenizer_path)
                .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;

            Ok((session, tokenizer))
        })
        .await
        .context("Encoder loading task panicked")??;

        let encoder = Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
            model_name,
            dimension: MINILM_DIMENSION,
        };

        // Probe once so a wrong model fails at startup, not on the first question
        let probe = encoder.clone();
        let width = tokio::task::spawn_blocking(move || probe.encode_blocking("validation test"))
            .await
            .context("Encoder probe task panicked")??
            .len();
        if width != MINILM_DIMENSION {
            anyhow::bail!(
                "Model outputs unexpected dimensions: {} (expected {})",
                width,
                MINILM_DIMENSION
            );
        }

        info!(model = %encoder.model_name, dimension = encoder.dimension, "ONNX encoder ready");
        Ok(encoder)
    }

    fn encode_blocking(&self, text: &str) -> Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

        let take = encoding.get_ids().len().min(MAX_SEQUENCE_LENGTH);
        let input_ids: Vec<i64> = encoding.get_ids()[..take]
            .iter()
            .map(|&id| id as i64)
            .collect();
        let attention_mask: Vec<i64> = encoding.get_attention_mask()[..take]
            .iter()
            .map(|&m| m as i64)
            .collect();
        let token_type_ids: Vec<i64> = vec![0i64; take];
        let pooling_mask = attention_mask.clone();

        let input_ids_array = Array2::from_shape_vec((1, take), input_ids)
            .context("Failed to create input_ids array")?;
        let attention_mask_array = Array2::from_shape_vec((1, take), attention_mask)
            .context("Failed to create attention_mask array")?;
        let token_type_ids_array = Array2::from_shape_vec((1, take), token_type_ids)
            .context("Failed to create token_type_ids array")?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("ONNX session lock poisoned"))?;
        let outputs = session.run(ort::inputs![
            "input_ids" => Value::from_array(input_ids_array)?,
            "attention_mask" => Value::from_array(attention_mask_array)?,
            "token_type_ids" => Value::from_array(token_type_ids_array)?
        ])?;

        // Token-level output: [batch, seq_len, hidden_dim]
        let output = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;
        if output.shape().len() != 3 {
            anyhow::bail!("Unexpected output shape: {:?}", output.shape());
        }
        let tokens = output.index_axis(Axis(0), 0);
        let seq_len = tokens.shape()[0];
        let hidden_dim = tokens.shape()[1];

        let mut pooled = vec![0.0f32; hidden_dim];
        let mut mask_total = 0.0f32;
        for i in 0..seq_len.min(pooling_mask.len()) {
            let weight = pooling_mask[i] as f32;
            mask_total += weight;
            for (j, value) in pooled.iter_mut().enumerate() {
                *value += tokens[[i, j]] * weight;
            }
        }
        for value in &mut pooled {
            *value /= mask_total.max(1e-9);
        }

        l2_normalize(&mut pooled);
        Ok(pooled)
    }
}

#[async_trait]
impl Encoder for OnnxEncoder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        &self.model_name
    }

    async fn embed(&self, text: &str) -> RagResult<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(RagError::EncodingError(
                "cannot embed empty text".to_string(),
            ));
        }

        let encoder = self.clone();
        let text = text.to_string();
        let embedding = tokio::task::spawn_blocking(move || encoder.encode_blocking(&text))
            .await
            .map_err(|e| RagError::EncodingError(format!("encoder task failed: {}", e)))?
            .map_err(|e| RagError::EncodingError(e.to_string()))?;

        if embedding.len() != self.dimension {
            return Err(RagError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }

        debug!(model = %self.model_name, "text embedded");
        Ok(embedding)
    }
}
