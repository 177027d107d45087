// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Menu catalog: records, chunk template and the index-aware store

pub mod menu_item;
pub mod seed;
pub mod store;

pub use menu_item::{build_chunk, MenuItem, MenuItemInput, FALLBACK_CATEGORY};
pub use seed::{demo_menu, seed_catalog};
pub use store::{spawn_reconcile_task, MenuCatalog};
