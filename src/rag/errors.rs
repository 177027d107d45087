// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error types for the retrieval-augmented chat pipeline
//!
//! One taxonomy shared by the vector store, the encoder and generator
//! adapters, the index synchronizer and the chat session:
//! - Input errors (empty question, malformed message, bad vector values)
//! - Configuration errors (vector dimension mismatch)
//! - Collaborator failures (encoder, generator, timeouts)
//! - Index defects (embedding entry out of step with the catalog)

use thiserror::Error;

/// Result alias used throughout the pipeline
pub type RagResult<T> = std::result::Result<T, RagError>;

/// Errors raised below the chat session
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RagError {
    /// Empty question, malformed payload or unusable vector values
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Vector length differs from the configured dimensionality
    #[error("Dimension mismatch: expected {expected}D, got {actual}D")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The encoder could not turn text into a vector
    #[error("Encoding failed: {0}")]
    EncodingError(String),

    /// The generation backend failed or was unreachable
    #[error("Generation failed: {0}")]
    GenerationError(String),

    /// An embedding entry without a live record, or the reverse
    #[error("Consistency violation for record {record_id}: {reason}")]
    ConsistencyViolation { record_id: String, reason: String },

    /// Catalog record lookup by identifier failed
    #[error("Record not found: {0}")]
    NotFound(String),

    /// A suspension point exceeded its configured budget
    #[error("{stage} timed out after {timeout_ms}ms")]
    Timeout { stage: &'static str, timeout_ms: u64 },
}

impl RagError {
    /// Short message safe to stream to a chat client
    pub fn user_message(&self) -> String {
        match self {
            RagError::InvalidInput(_) => {
                "Sorry, I couldn't understand that question.".to_string()
            }
            RagError::EncodingError(_) => {
                "Sorry, I couldn't search the menu right now. Please try again.".to_string()
            }
            RagError::GenerationError(_) => {
                "Sorry, the menu assistant is unavailable right now. Please try again later."
                    .to_string()
            }
            RagError::Timeout { .. } => {
                "Sorry, that took too long. Please try again.".to_string()
            }
            RagError::DimensionMismatch { .. } | RagError::ConsistencyViolation { .. } => {
                "Sorry, the menu index is misconfigured.".to_string()
            }
            RagError::NotFound(id) => format!("Menu item {} was not found.", id),
        }
    }

    /// Get error code for logging
    pub fn error_code(&self) -> &'static str {
        match self {
            RagError::InvalidInput(_) => "INVALID_INPUT",
            RagError::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
            RagError::EncodingError(_) => "ENCODING_ERROR",
            RagError::GenerationError(_) => "GENERATION_ERROR",
            RagError::ConsistencyViolation { .. } => "CONSISTENCY_VIOLATION",
            RagError::NotFound(_) => "NOT_FOUND",
            RagError::Timeout { .. } => "TIMEOUT",
        }
    }

    /// Failures of the encoder or generator; the session survives these
    pub fn is_collaborator_failure(&self) -> bool {
        matches!(
            self,
            RagError::EncodingError(_) | RagError::GenerationError(_) | RagError::Timeout { .. }
        )
    }

    /// Misconfiguration that should stop startup rather than be reported per request
    pub fn is_fatal(&self) -> bool {
        matches!(self, RagError::DimensionMismatch { .. })
    }
}
