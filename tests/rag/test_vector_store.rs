// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Vector store contract: dimensions, ordering, replacement, concurrency

use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

use smart_menu_node::rag::RagError;
use smart_menu_node::vector::{InMemoryVectorStore, VectorStore};

fn unit(dim: usize, axis: usize) -> Vec<f32> {
    let mut v = vec![0.0; dim];
    v[axis] = 1.0;
    v
}

#[tokio::test]
async fn test_dimension_mismatch_on_upsert_and_query() {
    let store = InMemoryVectorStore::new(4);

    let result = store
        .upsert(Uuid::new_v4(), vec![1.0, 0.0, 0.0], "short".to_string())
        .await;
    assert_eq!(
        result,
        Err(RagError::DimensionMismatch {
            expected: 4,
            actual: 3
        })
    );
    assert!(store.is_empty().await);

    let result = store.nearest(&[1.0; 5], 3).await;
    assert!(matches!(
        result,
        Err(RagError::DimensionMismatch {
            expected: 4,
            actual: 5
        })
    ));
}

#[tokio::test]
async fn test_nearest_over_everything_returns_each_record_once() {
    let store = InMemoryVectorStore::new(8);
    let ids: Vec<Uuid> = (0..8).map(|_| Uuid::new_v4()).collect();

    for (i, id) in ids.iter().enumerate() {
        store
            .upsert(*id, unit(8, i), format!("chunk {}", i))
            .await
            .unwrap();
    }
    // Replace a few, delete one
    store
        .upsert(ids[2], unit(8, 0), "chunk 2 v2".to_string())
        .await
        .unwrap();
    store
        .upsert(ids[5], unit(8, 5), "chunk 5 v2".to_string())
        .await
        .unwrap();
    assert!(store.delete(ids[7]).await.unwrap());

    let results = store.nearest(&unit(8, 0), 100).await.unwrap();
    assert_eq!(results.len(), 7);

    let mut seen: Vec<Uuid> = results.iter().map(|n| n.record_id).collect();
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 7);
    assert!(!seen.contains(&ids[7]));

    for pair in results.windows(2) {
        assert!(pair[0].distance <= pair[1].distance);
    }

    // Two exact matches, in insertion order; the replaced entry kept its slot
    assert_eq!(results[0].record_id, ids[0]);
    assert_eq!(results[1].record_id, ids[2]);
    assert_eq!(results[1].content_chunk, "chunk 2 v2");
    assert!(results[1].distance.abs() < 1e-6);
}

#[tokio::test]
async fn test_upsert_is_idempotent() {
    let store = InMemoryVectorStore::new(3);
    let id = Uuid::new_v4();

    for _ in 0..3 {
        assert_ok!(
            store
                .upsert(id, vec![0.2, 0.4, 0.6], "same".to_string())
                .await
        );
    }

    assert_eq!(store.len().await, 1);
    let entry = store.get(id).await.unwrap();
    assert_eq!(entry.content_chunk, "same");
    assert_eq!(entry.vector, vec![0.2, 0.4, 0.6]);
}

#[tokio::test]
async fn test_ties_break_by_insertion_order() {
    let store = InMemoryVectorStore::new(2);
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();
    let third = Uuid::new_v4();

    // All three equidistant from the query
    store.upsert(second, vec![1.0, 0.0], "b".into()).await.unwrap();
    store.upsert(first, vec![1.0, 0.0], "a".into()).await.unwrap();
    store.upsert(third, vec![1.0, 0.0], "c".into()).await.unwrap();

    let results = store.nearest(&[1.0, 0.0], 3).await.unwrap();
    let order: Vec<&str> = results.iter().map(|n| n.content_chunk.as_str()).collect();
    assert_eq!(order, vec!["b", "a", "c"]);

    // Same answer every time
    for _ in 0..5 {
        let again = store.nearest(&[1.0, 0.0], 3).await.unwrap();
        assert_eq!(again, results);
    }
}

#[tokio::test]
async fn test_deleted_record_never_returned() {
    let store = InMemoryVectorStore::new(2);
    let id = Uuid::new_v4();
    store.upsert(id, vec![1.0, 0.0], "gone".into()).await.unwrap();

    assert!(store.delete(id).await.unwrap());
    assert!(!store.delete(id).await.unwrap());

    assert!(store.nearest(&[1.0, 0.0], 5).await.unwrap().is_empty());
    assert_err!(store.nearest(&[1.0, 0.0, 0.0], 5).await);
    assert!(store.get(id).await.is_none());
}

#[tokio::test]
async fn test_k_larger_than_store() {
    let store = InMemoryVectorStore::new(2);
    store
        .upsert(Uuid::new_v4(), vec![0.0, 1.0], "only".into())
        .await
        .unwrap();

    let results = store.nearest(&[0.0, 1.0], 10).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].content_chunk, "only");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_readers_never_see_torn_entries() {
    let store = Arc::new(InMemoryVectorStore::new(16));
    let id = Uuid::new_v4();
    store.upsert(id, unit(16, 0), "version 0".into()).await.unwrap();

    let writer = {
        let store = store.clone();
        tokio::spawn(async move {
            for version in 1..200usize {
                let axis = version % 16;
                store
                    .upsert(id, unit(16, axis), format!("version {}", version))
                    .await
                    .unwrap();
                tokio::task::yield_now().await;
            }
        })
    };

    let mut readers = Vec::new();
    for _ in 0..4 {
        let store = store.clone();
        readers.push(tokio::spawn(async move {
            for _ in 0..200 {
                let entry = store.get(id).await.unwrap();
                // Each chunk names the version whose axis is set in the vector
                let version: usize = entry
                    .content_chunk
                    .trim_start_matches("version ")
                    .parse()
                    .unwrap();
                assert_eq!(entry.vector[version % 16], 1.0);

                let hits = store.nearest(&unit(16, 3), 1).await.unwrap();
                assert_eq!(hits.len(), 1);
                assert_eq!(hits[0].record_id, id);
                tokio::task::yield_now().await;
            }
        }));
    }

    writer.await.unwrap();
    for reader in readers {
        reader.await.unwrap();
    }
    assert_eq!(store.len().await, 1);
}
