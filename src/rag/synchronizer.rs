// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Index synchronizer
//!
//! The only writer of embedding entries. Every catalog mutation is
//! mirrored into the vector store before the mutation returns:
//! - created / updated: `build_chunk`, embed, upsert
//! - deleted: delete
//!
//! An encoder failure is returned to the caller before the store is
//! touched, so the existing entry (if any) stays intact.

use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::errors::{RagError, RagResult};
use crate::catalog::{build_chunk, MenuItem};
use crate::embeddings::Encoder;
use crate::vector::VectorStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogOperation {
    Created,
    Updated,
    Deleted,
}

/// Notification sent by the catalog for every mutation
#[derive(Debug, Clone)]
pub struct CatalogChange<'a> {
    pub operation: CatalogOperation,
    pub record: &'a MenuItem,
}

impl<'a> CatalogChange<'a> {
    pub fn created(record: &'a MenuItem) -> Self {
        Self {
            operation: CatalogOperation::Created,
            record,
        }
    }

    pub fn updated(record: &'a MenuItem) -> Self {
        Self {
            operation: CatalogOperation::Updated,
            record,
        }
    }

    pub fn deleted(record: &'a MenuItem) -> Self {
        Self {
            operation: CatalogOperation::Deleted,
            record,
        }
    }
}

/// Outcome of a consistency pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Entries whose record no longer exists
    pub orphaned_removed: usize,
    /// Records that had no entry
    pub missing_restored: usize,
    /// Entries whose chunk no longer matched the record
    pub stale_refreshed: usize,
}

impl ReconcileReport {
    pub fn violations(&self) -> usize {
        self.orphaned_removed + self.missing_restored + self.stale_refreshed
    }
}

pub struct IndexSynchronizer {
    encoder: Arc<dyn Encoder>,
    store: Arc<dyn VectorStore>,
}

impl IndexSynchronizer {
    pub fn new(encoder: Arc<dyn Encoder>, store: Arc<dyn VectorStore>) -> Self {
        Self { encoder, store }
    }

    pub fn encoder(&self) -> &Arc<dyn Encoder> {
        &self.encoder
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Mirror one catalog mutation into the store
    pub async fn apply(&self, change: CatalogChange<'_>) -> RagResult<()> {
        match change.operation {
            CatalogOperation::Created | CatalogOperation::Updated => {
                self.index_record(change.record).await
            }
            CatalogOperation::Deleted => {
                let removed = self.store.delete(change.record.id).await?;
                debug!(record_id = %change.record.id, removed, "embedding removed");
                Ok(())
            }
        }
    }

    async fn index_record(&self, record: &MenuItem) -> RagResult<()> {
        let chunk = build_chunk(record);
        let vector = self.encoder.embed(&chunk).await?;
        self.store.upsert(record.id, vector, chunk).await?;
        debug!(record_id = %record.id, name = %record.name, "embedding upserted");
        Ok(())
    }

    /// Compare the live catalog with the store and repair every mismatch
    ///
    /// Each mismatch is logged as a `ConsistencyViolation` before it is
    /// repaired. Encoder failures while repairing are returned.
    pub async fn reconcile(&self, records: &[MenuItem]) -> RagResult<ReconcileReport> {
        let mut report = ReconcileReport::default();
        let live: HashSet<Uuid> = records.iter().map(|r| r.id).collect();

        for id in self.store.record_ids().await {
            if !live.contains(&id) {
                log_violation(&RagError::ConsistencyViolation {
                    record_id: id.to_string(),
                    reason: "embedding entry without a catalog record".to_string(),
                });
                self.store.delete(id).await?;
                report.orphaned_removed += 1;
            }
        }

        for record in records {
            match self.store.get(record.id).await {
                None => {
                    log_violation(&RagError::ConsistencyViolation {
                        record_id: record.id.to_string(),
                        reason: "catalog record without an embedding entry".to_string(),
                    });
                    self.index_record(record).await?;
                    report.missing_restored += 1;
                }
                Some(entry) if entry.content_chunk != build_chunk(record) => {
                    log_violation(&RagError::ConsistencyViolation {
                        record_id: record.id.to_string(),
                        reason: "embedding chunk is stale".to_string(),
                    });
                    self.index_record(record).await?;
                    report.stale_refreshed += 1;
                }
                Some(_) => {}
            }
        }

        info!(
            records = records.len(),
            orphaned_removed = report.orphaned_removed,
            missing_restored = report.missing_restored,
            stale_refreshed = report.stale_refreshed,
            "index reconciled"
        );
        Ok(report)
    }
}

fn log_violation(error: &RagError) {
    warn!(code = error.error_code(), "{}", error);
}

/// Startup check that the encoder and the store agree on vector length
pub fn ensure_dimensions(encoder: &dyn Encoder, store: &dyn VectorStore) -> RagResult<()> {
    if encoder.dimension() != store.dimension() {
        return Err(RagError::DimensionMismatch {
            expected: store.dimension(),
            actual: encoder.dimension(),
        });
    }
    Ok(())
}
