// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::rag::errors::{RagError, RagResult};

/// Category substituted into the chunk when a record has none
pub const FALLBACK_CATEGORY: &str = "General";

/// Request body for creating or fully replacing a menu item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItemInput {
    pub name: String,
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub category: Option<String>,
    /// Image URL or base64 payload, passed through untouched
    #[serde(default)]
    pub image_data: Option<String>,
}

impl MenuItemInput {
    pub fn validate(&self) -> RagResult<()> {
        if self.name.trim().is_empty() {
            return Err(RagError::InvalidInput("name must not be empty".to_string()));
        }
        if self.description.trim().is_empty() {
            return Err(RagError::InvalidInput(
                "description must not be empty".to_string(),
            ));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(RagError::InvalidInput(format!(
                "price must be a non-negative number, got {}",
                self.price
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub category: Option<String>,
    pub image_data: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl MenuItem {
    /// New record with a fresh identifier; the input is not validated here
    pub fn from_input(input: MenuItemInput) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: input.name,
            description: input.description,
            price: input.price,
            category: input.category,
            image_data: input.image_data,
            created_at: Utc::now(),
        }
    }

    /// Copy of this record with every mutable field replaced
    pub fn with_update(&self, input: MenuItemInput) -> Self {
        Self {
            id: self.id,
            name: input.name,
            description: input.description,
            price: input.price,
            category: input.category,
            image_data: input.image_data,
            created_at: self.created_at,
        }
    }
}

/// Text that is embedded for a record
///
/// Changing this template changes the meaning of every stored vector;
/// existing entries must be re-embedded (see `IndexSynchronizer::reconcile`).
pub fn build_chunk(record: &MenuItem) -> String {
    let category = record
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(FALLBACK_CATEGORY);
    format!(
        "Name: {}. Category: {}. Description: {}.",
        record.name.trim(),
        category,
        record.description.trim().trim_end_matches('.')
    )
}
