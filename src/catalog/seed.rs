// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use tracing::info;

use super::menu_item::MenuItemInput;
use super::store::MenuCatalog;
use crate::rag::errors::{RagError, RagResult};

const DEMO_MENU_JSON: &str = include_str!("../../data/demo_menu.json");

/// Thai restaurant demo menu bundled with the binary
pub fn demo_menu() -> RagResult<Vec<MenuItemInput>> {
    serde_json::from_str(DEMO_MENU_JSON)
        .map_err(|e| RagError::InvalidInput(format!("bundled demo menu is invalid: {}", e)))
}

/// Load the demo menu through the normal create path
///
/// Does nothing when the catalog already has records. Returns the
/// number of items added.
pub async fn seed_catalog(catalog: &MenuCatalog) -> RagResult<usize> {
    if !catalog.is_empty().await {
        info!("catalog already populated, skipping seed");
        return Ok(0);
    }

    let items = demo_menu()?;
    let total = items.len();
    for (i, item) in items.into_iter().enumerate() {
        info!(item = i + 1, total, name = %item.name, "seeding menu item");
        catalog.create(item).await?;
    }

    info!(items = total, "demo menu seeded");
    Ok(total)
}
