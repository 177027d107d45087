// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::{Deserialize, Serialize};

/// Borrowed view over an embedding vector with the similarity math the
/// store and encoders need.
#[derive(Debug, Clone, Copy)]
pub struct Embedding<'a> {
    data: &'a [f32],
}

impl<'a> Embedding<'a> {
    pub fn new(data: &'a [f32]) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &[f32] {
        self.data
    }

    pub fn dimension(&self) -> usize {
        self.data.len()
    }

    pub fn magnitude(&self) -> f32 {
        self.data.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    /// Cosine similarity in `[-1, 1]`; zero-magnitude vectors score 0
    pub fn cosine_similarity(&self, other: &Embedding<'_>) -> f32 {
        if self.dimension() != other.dimension() {
            return 0.0;
        }

        let dot_product: f32 = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| a * b)
            .sum();

        let magnitude_self = self.magnitude();
        let magnitude_other = other.magnitude();

        if magnitude_self == 0.0 || magnitude_other == 0.0 {
            0.0
        } else {
            dot_product / (magnitude_self * magnitude_other)
        }
    }

    /// `1 - cosine_similarity`; lower means more similar
    pub fn cosine_distance(&self, other: &Embedding<'_>) -> f32 {
        1.0 - self.cosine_similarity(other)
    }

    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }
}

/// Scale a vector to unit length in place. Zero vectors are left as is.
pub fn l2_normalize(values: &mut [f32]) {
    let norm = values.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in values.iter_mut() {
            *value /= norm;
        }
    }
}

/// Distance metric used by the vector store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    #[default]
    Cosine,
}

impl DistanceMetric {
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::Cosine => Embedding::new(a).cosine_distance(&Embedding::new(b)),
        }
    }
}
