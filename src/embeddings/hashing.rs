// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use super::Encoder;
use crate::rag::errors::{RagError, RagResult};
use crate::vector::l2_normalize;

/// Words too common in questions to say anything about a dish
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "any", "are", "can", "do", "does", "for", "have", "i", "in", "is", "it",
    "me", "my", "of", "on", "or", "our", "that", "the", "this", "to", "we", "what", "which",
    "with", "you", "your",
];

/// Deterministic bag-of-words encoder
///
/// Lower-cased word tokens (stopwords dropped, trailing plural `s`
/// stripped) are hashed into `dimension` signed buckets and the result
/// is L2-normalised. No model files are needed, so this is the fallback
/// when no ONNX model is configured.
#[derive(Debug, Clone)]
pub struct HashingEncoder {
    dimension: usize,
}

impl HashingEncoder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_lowercase())
            .filter(|t| !STOPWORDS.contains(&t.as_str()))
            .map(|t| stem(&t))
    }

    fn encode(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimension];

        for token in Self::tokens(text) {
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let hash = hasher.finish();

            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if (hash >> 63) & 1 == 0 { 1.0 } else { -1.0 };
            embedding[bucket] += sign;
        }

        l2_normalize(&mut embedding);
        embedding
    }
}

fn stem(token: &str) -> String {
    if token.len() > 3 && token.ends_with('s') && !token.ends_with("ss") {
        token[..token.len() - 1].to_string()
    } else {
        token.to_string()
    }
}

#[async_trait]
impl Encoder for HashingEncoder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "hashing-bow"
    }

    async fn embed(&self, text: &str) -> RagResult<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(RagError::EncodingError(
                "cannot embed empty text".to_string(),
            ));
        }
        Ok(self.encode(text))
    }
}
