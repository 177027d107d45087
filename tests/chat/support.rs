// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Test doubles and a channel-backed harness for driving a ChatSession

use async_trait::async_trait;
use futures::channel::mpsc as fmpsc;
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use uuid::Uuid;

use smart_menu_node::api::websocket::{ChatSession, Inbound, SessionConfig, DONE_MARKER};
use smart_menu_node::embeddings::{Encoder, HashingEncoder};
use smart_menu_node::inference::{FragmentStream, Generator};
use smart_menu_node::rag::{ChatPipeline, RagError, RagResult, Retriever};
use smart_menu_node::vector::{InMemoryVectorStore, VectorStore};

pub const DIMENSION: usize = 384;

pub const TOM_YUM_CHUNK: &str =
    "Name: Tom Yum Goong. Category: Soup. Description: spicy prawn soup.";

/// How the scripted generator answers
#[derive(Clone)]
pub enum Script {
    /// Fixed fragments
    Fragments(Vec<String>),
    /// `{question}-1 .. {question}-n`, so answers can be told apart
    Echo { parts: usize },
    /// `generate` itself fails
    FailImmediately,
    /// Yields the fragments, then an error
    FailAfter(Vec<String>),
    /// Yields the fragments, then never produces anything again
    StallAfter(Vec<String>),
}

/// Generator double that records every call
pub struct ScriptedGenerator {
    script: Script,
    delay: Duration,
    pub calls: Mutex<Vec<(String, String)>>,
    /// Number of answer streams dropped (finished or cancelled)
    pub released: Arc<AtomicUsize>,
}

impl ScriptedGenerator {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            released: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Pause before every fragment
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_instruction(&self) -> Option<String> {
        self.calls.lock().unwrap().last().map(|(system, _)| system.clone())
    }
}

struct ReleaseGuard(Arc<AtomicUsize>);

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

fn scripted_stream(
    items: Vec<RagResult<String>>,
    stall: bool,
    delay: Duration,
    guard: ReleaseGuard,
) -> FragmentStream {
    stream::unfold((items.into_iter(), guard), move |(mut items, guard)| async move {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match items.next() {
            Some(item) => Some((item, (items, guard))),
            None if stall => {
                std::future::pending::<()>().await;
                None
            }
            None => None,
        }
    })
    .boxed()
}

fn ok_items(parts: &[String]) -> Vec<RagResult<String>> {
    parts.iter().cloned().map(Ok).collect()
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(
        &self,
        system_instruction: &str,
        user_question: &str,
    ) -> RagResult<FragmentStream> {
        self.calls
            .lock()
            .unwrap()
            .push((system_instruction.to_string(), user_question.to_string()));

        let guard = ReleaseGuard(self.released.clone());

        match &self.script {
            Script::Fragments(parts) => Ok(scripted_stream(ok_items(parts), false, self.delay, guard)),
            Script::Echo { parts } => {
                let items = (1..=*parts)
                    .map(|i| Ok(format!("{}-{}", user_question, i)))
                    .collect();
                Ok(scripted_stream(items, false, self.delay, guard))
            }
            Script::FailImmediately => Err(RagError::GenerationError(
                "connection refused".to_string(),
            )),
            Script::FailAfter(parts) => {
                let mut items = ok_items(parts);
                items.push(Err(RagError::GenerationError("backend dropped".to_string())));
                Ok(scripted_stream(items, false, self.delay, guard))
            }
            Script::StallAfter(parts) => Ok(scripted_stream(ok_items(parts), true, self.delay, guard)),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Encoder that sleeps before delegating, or fails on demand
pub struct SlowEncoder {
    inner: HashingEncoder,
    delay: Duration,
    pub failing: AtomicBool,
    pub started: AtomicUsize,
}

impl SlowEncoder {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: HashingEncoder::new(DIMENSION),
            delay,
            failing: AtomicBool::new(false),
            started: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Encoder for SlowEncoder {
    fn dimension(&self) -> usize {
        DIMENSION
    }

    fn name(&self) -> &str {
        "slow"
    }

    async fn embed(&self, text: &str) -> RagResult<Vec<f32>> {
        self.started.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        if self.failing.load(Ordering::SeqCst) {
            return Err(RagError::EncodingError("encoder offline".to_string()));
        }
        self.inner.embed(text).await
    }
}

/// Store holding `chunks`, embedded with the hashing encoder
pub async fn store_with(chunks: &[&str]) -> Arc<InMemoryVectorStore> {
    let encoder = HashingEncoder::new(DIMENSION);
    let store = Arc::new(InMemoryVectorStore::new(DIMENSION));
    for chunk in chunks {
        let vector = encoder.embed(chunk).await.unwrap();
        store
            .upsert(Uuid::new_v4(), vector, chunk.to_string())
            .await
            .unwrap();
    }
    store
}

pub fn pipeline(
    encoder: Arc<dyn Encoder>,
    store: Arc<InMemoryVectorStore>,
    generator: Arc<ScriptedGenerator>,
    top_k: usize,
) -> Arc<ChatPipeline> {
    let retriever = Retriever::new(encoder, store).with_top_k(top_k);
    Arc::new(ChatPipeline::new(retriever, generator))
}

/// Pipeline over `chunks` with the hashing encoder and `generator`
pub async fn simple_pipeline(
    chunks: &[&str],
    generator: Arc<ScriptedGenerator>,
) -> Arc<ChatPipeline> {
    let store = store_with(chunks).await;
    pipeline(Arc::new(HashingEncoder::new(DIMENSION)), store, generator, 3)
}

pub struct SessionHarness {
    inbound: Option<mpsc::UnboundedSender<Inbound>>,
    pub replies: fmpsc::UnboundedReceiver<String>,
    pub handle: JoinHandle<ChatSession>,
}

impl SessionHarness {
    pub fn start(pipeline: Arc<ChatPipeline>, config: SessionConfig) -> Self {
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = fmpsc::unbounded();
        let handle = tokio::spawn(async move {
            let mut session = ChatSession::new(pipeline, config);
            session.run(UnboundedReceiverStream::new(in_rx), out_tx).await;
            session
        });
        Self {
            inbound: Some(in_tx),
            replies: out_rx,
            handle,
        }
    }

    pub fn send(&self, frame: Inbound) {
        if let Some(tx) = &self.inbound {
            let _ = tx.send(frame);
        }
    }

    /// Extra handle on the inbound side, for sending from another task
    pub fn inbound_handle(&self) -> Option<mpsc::UnboundedSender<Inbound>> {
        self.inbound.clone()
    }

    pub fn ask(&self, question: &str) {
        self.send(Inbound::Text(
            serde_json::json!({ "question": question }).to_string(),
        ));
    }

    pub fn send_raw(&self, text: &str) {
        self.send(Inbound::Text(text.to_string()));
    }

    pub fn close(&self) {
        self.send(Inbound::Close);
    }

    /// Drop the inbound side entirely, as when the transport goes away
    pub fn hang_up(&mut self) {
        self.inbound.take();
    }

    pub async fn next_reply(&mut self) -> Option<String> {
        tokio::time::timeout(Duration::from_secs(5), self.replies.next())
            .await
            .expect("timed out waiting for a reply")
    }

    /// Fragments up to and including the next `[DONE]`
    pub async fn next_answer(&mut self) -> Vec<String> {
        let mut answer = Vec::new();
        loop {
            let reply = self
                .next_reply()
                .await
                .expect("session ended before [DONE]");
            let done = reply == DONE_MARKER;
            answer.push(reply);
            if done {
                return answer;
            }
        }
    }

    /// Close, then wait for the session to finish and collect stray replies
    pub async fn finish(mut self) -> (ChatSession, Vec<String>) {
        self.close();
        self.hang_up();
        let session = tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("session did not stop")
            .expect("session task panicked");
        let mut rest = Vec::new();
        while let Some(reply) = self.replies.next().await {
            rest.push(reply);
        }
        (session, rest)
    }
}
