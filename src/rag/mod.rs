// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// RAG (Retrieval-Augmented Generation) module
// Keeps the menu index in step with the catalog and answers questions from it

pub mod errors;
pub mod pipeline;
pub mod prompt;
pub mod retriever;
pub mod synchronizer;

pub use errors::{RagError, RagResult};
pub use pipeline::ChatPipeline;
pub use prompt::{system_instruction, NO_CONTEXT_MARKER};
pub use retriever::{RetrievalContext, Retriever, DEFAULT_TOP_K};
pub use synchronizer::{
    ensure_dimensions, CatalogChange, CatalogOperation, IndexSynchronizer, ReconcileReport,
};
