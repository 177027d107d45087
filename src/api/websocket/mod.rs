// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod handler;
pub mod messages;
pub mod session;

pub use handler::handle_chat_socket;
pub use messages::{parse_question, ChatRequest, Inbound, DONE_MARKER};
pub use session::{ChatSession, SessionConfig, SessionState, SessionStats};
