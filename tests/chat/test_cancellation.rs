// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Closing a session cancels whatever it is waiting on

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use smart_menu_node::api::websocket::{SessionConfig, SessionState, DONE_MARKER};

use super::support::*;

fn many_fragments(n: usize) -> Script {
    Script::Fragments((0..n).map(|i| format!("t{} ", i)).collect())
}

#[tokio::test]
async fn test_close_mid_stream_cancels_generation() {
    let generator = Arc::new(
        ScriptedGenerator::new(many_fragments(200)).with_delay(Duration::from_millis(10)),
    );
    let pipeline = simple_pipeline(&[TOM_YUM_CHUNK], generator.clone()).await;

    let mut harness = SessionHarness::start(pipeline, SessionConfig::default());
    harness.ask("What soups do you have?");
    assert_eq!(harness.next_reply().await.as_deref(), Some("t0 "));

    let (session, rest) = harness.finish().await;
    assert!(!rest.contains(&DONE_MARKER.to_string()));
    assert!(rest.len() < 199, "generation kept running after close");
    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(session.stats().answered, 0);

    // The fragment stream was dropped, not left dangling
    assert_eq!(generator.released.load(Ordering::SeqCst), 1);

    // Nothing else is emitted later either
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(generator.call_count(), 1);
}

#[tokio::test]
async fn test_transport_loss_mid_stream_cancels_generation() {
    let generator = Arc::new(
        ScriptedGenerator::new(many_fragments(200)).with_delay(Duration::from_millis(10)),
    );
    let pipeline = simple_pipeline(&[TOM_YUM_CHUNK], generator.clone()).await;

    let mut harness = SessionHarness::start(pipeline, SessionConfig::default());
    harness.ask("What soups do you have?");
    assert!(harness.next_reply().await.is_some());

    harness.hang_up();
    let mut rest = Vec::new();
    while let Some(reply) = harness.next_reply().await {
        rest.push(reply);
    }
    assert!(!rest.contains(&DONE_MARKER.to_string()));
    assert_eq!(generator.released.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_close_during_retrieval_discards_result() {
    let generator = Arc::new(ScriptedGenerator::new(many_fragments(3)));
    let encoder = Arc::new(SlowEncoder::new(Duration::from_secs(10)));
    let store = store_with(&[TOM_YUM_CHUNK]).await;
    let pipeline = pipeline(encoder.clone(), store, generator.clone(), 3);

    let mut harness = SessionHarness::start(pipeline, SessionConfig::default());
    harness.ask("What soups do you have?");

    // Wait until the retrieval is actually in flight
    while encoder.started.load(Ordering::SeqCst) == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let started = std::time::Instant::now();
    let (session, rest) = harness.finish().await;
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(rest.is_empty());
    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(generator.call_count(), 0);
}

#[tokio::test]
async fn test_close_while_idle() {
    let generator = Arc::new(ScriptedGenerator::new(many_fragments(1)));
    let pipeline = simple_pipeline(&[TOM_YUM_CHUNK], generator.clone()).await;

    let harness = SessionHarness::start(pipeline, SessionConfig::default());
    let (session, rest) = harness.finish().await;
    assert!(rest.is_empty());
    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(generator.call_count(), 0);
}
