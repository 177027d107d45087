// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::sync::Arc;
use tracing::debug;

use super::errors::RagResult;
use super::prompt::system_instruction;
use super::retriever::{RetrievalContext, Retriever};
use crate::inference::{FragmentStream, Generator};

/// Retrieval and generation handles shared by every chat session
pub struct ChatPipeline {
    retriever: Retriever,
    generator: Arc<dyn Generator>,
}

impl ChatPipeline {
    pub fn new(retriever: Retriever, generator: Arc<dyn Generator>) -> Self {
        Self {
            retriever,
            generator,
        }
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub async fn retrieve(&self, question: &str) -> RagResult<RetrievalContext> {
        self.retriever.retrieve(question).await
    }

    /// Open the answer stream for `question`, bound to `context`
    pub async fn start_answer(
        &self,
        context: &RetrievalContext,
        question: &str,
    ) -> RagResult<FragmentStream> {
        let instruction = system_instruction(context);
        debug!(
            generator = self.generator.name(),
            context_chunks = context.len(),
            "starting generation"
        );
        self.generator.generate(&instruction, question).await
    }
}
