// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod errors;
pub mod handlers;
pub mod menu;
pub mod server;
pub mod websocket;

pub use errors::{ApiError, ErrorResponse};
pub use handlers::{HealthResponse, WelcomeResponse};
pub use server::{create_router, serve, AppState};
