// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::rag::errors::RagError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error_type: String,
    /// Kept as `detail` for clients written against the original menu API
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Debug, Clone)]
pub enum ApiError {
    NotFound(String),
    InvalidRequest(String),
    ServiceUnavailable { code: &'static str, message: String },
    InternalError { code: &'static str, message: String },
    Timeout(String),
}

impl ApiError {
    pub fn to_response(&self) -> ErrorResponse {
        let (error_type, detail, code) = match self {
            ApiError::NotFound(msg) => ("not_found", msg.clone(), None),
            ApiError::InvalidRequest(msg) => ("invalid_request", msg.clone(), None),
            ApiError::ServiceUnavailable { code, message } => {
                ("service_unavailable", message.clone(), Some(code.to_string()))
            }
            ApiError::InternalError { code, message } => {
                ("internal_error", message.clone(), Some(code.to_string()))
            }
            ApiError::Timeout(msg) => ("timeout", msg.clone(), Some("TIMEOUT".to_string())),
        };

        ErrorResponse {
            error_type: error_type.to_string(),
            detail,
            code,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ApiError::ServiceUnavailable { message, .. } => {
                write!(f, "Service unavailable: {}", message)
            }
            ApiError::InternalError { message, .. } => write!(f, "Internal error: {}", message),
            ApiError::Timeout(msg) => write!(f, "Timed out: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        let code = err.error_code();
        match err {
            RagError::NotFound(_) => ApiError::NotFound("Menu item not found".to_string()),
            RagError::InvalidInput(msg) => ApiError::InvalidRequest(msg),
            RagError::Timeout { .. } => ApiError::Timeout(err.to_string()),
            RagError::EncodingError(_) | RagError::GenerationError(_) => {
                ApiError::ServiceUnavailable {
                    code,
                    message: err.to_string(),
                }
            }
            RagError::DimensionMismatch { .. } | RagError::ConsistencyViolation { .. } => {
                ApiError::InternalError {
                    code,
                    message: err.to_string(),
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.to_response())).into_response()
    }
}
