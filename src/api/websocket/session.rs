// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Per-connection chat session
//!
//! ```text
//! Idle ──question──▶ AwaitingRetrieval ──context──▶ Streaming ──exhausted──▶ Idle
//!   any state ──close / transport error──▶ Closed
//! ```
//!
//! Exactly one question is in flight. Questions that arrive while busy
//! are queued (bounded) and answered in arrival order after the current
//! `[DONE]`. Every exchange that is not cut short by a close ends with
//! exactly one `[DONE]`; failures stream one error fragment first.
//!
//! Inbound frames are read concurrently with retrieval and generation,
//! so a close drops the in-flight futures (and the generator stream)
//! immediately.

use futures::sink::{Sink, SinkExt};
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::messages::{parse_question, Inbound, DONE_MARKER};
use crate::inference::FragmentStream;
use crate::rag::errors::{RagError, RagResult};
use crate::rag::pipeline::ChatPipeline;

pub const DEFAULT_MAX_PENDING_QUESTIONS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    AwaitingRetrieval,
    Streaming,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Questions held while an answer is in flight; extra ones are dropped
    pub max_pending_questions: usize,
    /// Budget for encoding the question and searching the store
    pub retrieval_timeout: Option<Duration>,
    /// Budget for opening the answer stream and for each following fragment
    pub fragment_timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_pending_questions: DEFAULT_MAX_PENDING_QUESTIONS,
            retrieval_timeout: None,
            fragment_timeout: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub answered: usize,
    pub failed: usize,
    pub queued: usize,
    pub dropped: usize,
    /// Malformed text frames plus non-text frames (ping, binary)
    pub ignored: usize,
}

enum Flow {
    Continue,
    Closed,
}

pub struct ChatSession {
    id: String,
    pipeline: Arc<ChatPipeline>,
    config: SessionConfig,
    state: SessionState,
    pending: VecDeque<String>,
    stats: SessionStats,
}

impl ChatSession {
    pub fn new(pipeline: Arc<ChatPipeline>, config: SessionConfig) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            pipeline,
            config,
            state: SessionState::Idle,
            pending: VecDeque::new(),
            stats: SessionStats::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Drive the session until the peer closes
    ///
    /// `inbound` ending is treated as a close. A failed send means the
    /// transport is gone and also closes the session.
    pub async fn run<I, O>(&mut self, mut inbound: I, mut outbound: O)
    where
        I: Stream<Item = Inbound> + Unpin,
        O: Sink<String> + Unpin,
        O::Error: Display,
    {
        info!(session_id = %self.id, "chat session opened");

        while self.state != SessionState::Closed {
            let question = match self.pending.pop_front() {
                Some(question) => question,
                None => match inbound.next().await {
                    None | Some(Inbound::Close) => break,
                    Some(Inbound::Ignored) => {
                        self.stats.ignored += 1;
                        continue;
                    }
                    Some(Inbound::Text(text)) => match parse_question(&text) {
                        Some(question) => question,
                        None => {
                            self.stats.ignored += 1;
                            debug!(session_id = %self.id, "ignoring malformed chat message");
                            continue;
                        }
                    },
                },
            };

            if let Flow::Closed = self.exchange(question, &mut inbound, &mut outbound).await {
                break;
            }
        }

        self.state = SessionState::Closed;
        info!(
            session_id = %self.id,
            answered = self.stats.answered,
            failed = self.stats.failed,
            dropped = self.stats.dropped,
            "chat session closed"
        );
    }

    /// One question → fragments* → `[DONE]`, unless the peer closes first
    async fn exchange<I, O>(
        &mut self,
        question: String,
        inbound: &mut I,
        outbound: &mut O,
    ) -> Flow
    where
        I: Stream<Item = Inbound> + Unpin,
        O: Sink<String> + Unpin,
        O::Error: Display,
    {
        self.state = SessionState::AwaitingRetrieval;
        debug!(session_id = %self.id, question = %question, "answering question");

        let opening = open_answer(self.pipeline.clone(), question, self.config);
        tokio::pin!(opening);
        let opened = loop {
            tokio::select! {
                result = &mut opening => break result,
                frame = inbound.next() => {
                    if let Flow::Closed = self.on_busy_frame(frame) {
                        debug!(session_id = %self.id, "closed during retrieval, discarding");
                        return Flow::Closed;
                    }
                }
            }
        };

        let mut fragments = match opened {
            Ok(stream) => stream,
            Err(e) => return self.fail(e, outbound).await,
        };

        self.state = SessionState::Streaming;
        // One deadline per fragment; inbound traffic does not push it back
        let fragment_timeout = self.config.fragment_timeout;
        let stall = tokio::time::sleep(fragment_timeout.unwrap_or_default());
        tokio::pin!(stall);
        let mut emitted = 0usize;
        loop {
            tokio::select! {
                next = fragments.next() => {
                    match next {
                        Some(Ok(fragment)) => {
                            if let Err(e) = outbound.send(fragment).await {
                                debug!(session_id = %self.id, error = %e, "send failed, closing");
                                return Flow::Closed;
                            }
                            emitted += 1;
                            if let Some(limit) = fragment_timeout {
                                stall.as_mut().reset(Instant::now() + limit);
                            }
                        }
                        Some(Err(e)) => return self.fail(e, outbound).await,
                        None => break,
                    }
                }
                _ = &mut stall, if fragment_timeout.is_some() => {
                    let timeout_ms = fragment_timeout.map_or(0, |limit| limit.as_millis() as u64);
                    let err = RagError::Timeout {
                        stage: "generation",
                        timeout_ms,
                    };
                    return self.fail(err, outbound).await;
                }
                frame = inbound.next() => {
                    if let Flow::Closed = self.on_busy_frame(frame) {
                        // Dropping `fragments` cancels the generation
                        debug!(
                            session_id = %self.id,
                            emitted,
                            "closed mid-stream, cancelling generation"
                        );
                        return Flow::Closed;
                    }
                }
            }
        }

        if let Err(e) = outbound.send(DONE_MARKER.to_string()).await {
            debug!(session_id = %self.id, error = %e, "send failed, closing");
            return Flow::Closed;
        }
        self.stats.answered += 1;
        self.state = SessionState::Idle;
        debug!(session_id = %self.id, fragments = emitted, "answer complete");
        Flow::Continue
    }

    fn on_busy_frame(&mut self, frame: Option<Inbound>) -> Flow {
        let text = match frame {
            None | Some(Inbound::Close) => return Flow::Closed,
            Some(Inbound::Ignored) => {
                self.stats.ignored += 1;
                return Flow::Continue;
            }
            Some(Inbound::Text(text)) => text,
        };

        match parse_question(&text) {
            Some(question) if self.pending.len() < self.config.max_pending_questions => {
                self.pending.push_back(question);
                self.stats.queued += 1;
                debug!(session_id = %self.id, pending = self.pending.len(), "question queued");
            }
            Some(_) => {
                self.stats.dropped += 1;
                warn!(
                    session_id = %self.id,
                    limit = self.config.max_pending_questions,
                    "question queue full, dropping question"
                );
            }
            None => {
                self.stats.ignored += 1;
                debug!(session_id = %self.id, "ignoring malformed chat message");
            }
        }
        Flow::Continue
    }

    /// Terminate the current exchange with an error fragment and `[DONE]`
    async fn fail<O>(&mut self, err: RagError, outbound: &mut O) -> Flow
    where
        O: Sink<String> + Unpin,
        O::Error: Display,
    {
        if err.is_fatal() {
            error!(session_id = %self.id, code = err.error_code(), error = %err, "exchange failed");
        } else {
            warn!(session_id = %self.id, code = err.error_code(), error = %err, "exchange failed");
        }
        self.stats.failed += 1;

        for message in [err.user_message(), DONE_MARKER.to_string()] {
            if let Err(e) = outbound.send(message).await {
                debug!(session_id = %self.id, error = %e, "send failed, closing");
                return Flow::Closed;
            }
        }
        self.state = SessionState::Idle;
        Flow::Continue
    }
}

async fn open_answer(
    pipeline: Arc<ChatPipeline>,
    question: String,
    config: SessionConfig,
) -> RagResult<FragmentStream> {
    let context = within(
        config.retrieval_timeout,
        "retrieval",
        pipeline.retrieve(&question),
    )
    .await?;
    within(
        config.fragment_timeout,
        "generation",
        pipeline.start_answer(&context, &question),
    )
    .await
}

async fn within<T, F>(limit: Option<Duration>, stage: &'static str, fut: F) -> RagResult<T>
where
    F: Future<Output = RagResult<T>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| RagError::Timeout {
                stage,
                timeout_ms: limit.as_millis() as u64,
            })?,
        None => fut.await,
    }
}
