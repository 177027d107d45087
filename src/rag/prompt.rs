// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use super::retriever::RetrievalContext;

/// Stands in for the context when retrieval found nothing
pub const NO_CONTEXT_MARKER: &str = "(no menu items matched this question)";

const CONCIERGE_INSTRUCTION: &str = "You are a helpful restaurant concierge. \
Answer the customer's question based ONLY on the menu context provided below. \
If the answer is not in the context, say you don't know and suggest they ask \
about the dishes listed.";

/// Build the system instruction that binds the generator to the retrieved menu context
pub fn system_instruction(context: &RetrievalContext) -> String {
    let body = if context.is_empty() {
        NO_CONTEXT_MARKER.to_string()
    } else {
        context.joined()
    };
    format!("{}\n\nContext:\n{}", CONCIERGE_INSTRUCTION, body)
}
