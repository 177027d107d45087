// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod embeddings;
pub mod inference;
pub mod rag;
pub mod vector;
pub mod version;

// Re-export main types
pub use api::websocket::{ChatSession, SessionConfig, SessionState, DONE_MARKER};
pub use api::{create_router, AppState};
pub use catalog::{build_chunk, MenuCatalog, MenuItem, MenuItemInput};
pub use config::NodeConfig;
pub use embeddings::{Encoder, HashingEncoder, OnnxEncoder};
pub use inference::{FragmentStream, Generator, OpenAiCompatGenerator};
pub use rag::{
    ChatPipeline, IndexSynchronizer, RagError, RagResult, RetrievalContext, Retriever,
};
pub use vector::{InMemoryVectorStore, VectorStore};
