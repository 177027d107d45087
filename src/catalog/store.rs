// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! In-memory menu catalog
//!
//! Every mutation runs under one gate and mirrors itself into the index
//! before it commits:
//! 1. Validate the input
//! 2. Notify the synchronizer (embed + upsert, or delete)
//! 3. Commit the record change
//!
//! If step 2 fails the mutation is rejected and neither the catalog nor
//! the store changes. Reads never wait on the gate.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::menu_item::{MenuItem, MenuItemInput};
use crate::rag::errors::{RagError, RagResult};
use crate::rag::synchronizer::{CatalogChange, IndexSynchronizer, ReconcileReport};

pub struct MenuCatalog {
    items: RwLock<Vec<MenuItem>>,
    mutation_gate: Mutex<()>,
    synchronizer: Arc<IndexSynchronizer>,
}

impl MenuCatalog {
    pub fn new(synchronizer: Arc<IndexSynchronizer>) -> Self {
        Self {
            items: RwLock::new(Vec::new()),
            mutation_gate: Mutex::new(()),
            synchronizer,
        }
    }

    pub fn synchronizer(&self) -> &Arc<IndexSynchronizer> {
        &self.synchronizer
    }

    /// All records in creation order
    pub async fn list(&self) -> Vec<MenuItem> {
        self.items.read().await.clone()
    }

    pub async fn get(&self, id: Uuid) -> RagResult<MenuItem> {
        self.items
            .read()
            .await
            .iter()
            .find(|item| item.id == id)
            .cloned()
            .ok_or_else(|| RagError::NotFound(id.to_string()))
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn create(&self, input: MenuItemInput) -> RagResult<MenuItem> {
        input.validate()?;
        let _gate = self.mutation_gate.lock().await;

        let record = MenuItem::from_input(input);
        self.synchronizer
            .apply(CatalogChange::created(&record))
            .await
            .inspect_err(|e| warn!(name = %record.name, error = %e, "menu item create rejected"))?;

        self.items.write().await.push(record.clone());
        info!(record_id = %record.id, name = %record.name, "menu item created");
        Ok(record)
    }

    /// Replace every mutable field of `id`
    pub async fn update(&self, id: Uuid, input: MenuItemInput) -> RagResult<MenuItem> {
        input.validate()?;
        let _gate = self.mutation_gate.lock().await;

        let updated = self.get(id).await?.with_update(input);
        self.synchronizer
            .apply(CatalogChange::updated(&updated))
            .await
            .inspect_err(|e| warn!(record_id = %id, error = %e, "menu item update rejected"))?;

        let mut items = self.items.write().await;
        if let Some(slot) = items.iter_mut().find(|item| item.id == id) {
            *slot = updated.clone();
        }
        info!(record_id = %id, name = %updated.name, "menu item updated");
        Ok(updated)
    }

    /// Remove `id`; returns whether it existed
    pub async fn delete(&self, id: Uuid) -> RagResult<bool> {
        let _gate = self.mutation_gate.lock().await;

        let record = match self.get(id).await {
            Ok(record) => record,
            Err(_) => return Ok(false),
        };
        self.synchronizer
            .apply(CatalogChange::deleted(&record))
            .await?;

        self.items.write().await.retain(|item| item.id != id);
        info!(record_id = %id, name = %record.name, "menu item deleted");
        Ok(true)
    }

    /// Run a consistency pass of the index against the current catalog
    pub async fn reconcile(&self) -> RagResult<ReconcileReport> {
        let _gate = self.mutation_gate.lock().await;
        let records = self.list().await;
        self.synchronizer.reconcile(&records).await
    }
}

/// Periodically reconcile the index against the catalog until `shutdown` fires
pub fn spawn_reconcile_task(
    catalog: Arc<MenuCatalog>,
    every: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick completes immediately; startup already reconciled
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    match catalog.reconcile().await {
                        Ok(report) if report.violations() > 0 => {
                            warn!(repaired = report.violations(), "index drift repaired");
                        }
                        Ok(_) => {}
                        Err(e) => error!(code = e.error_code(), error = %e, "index reconcile failed"),
                    }
                }
            }
        }
        debug!("reconcile task stopped");
    })
}
