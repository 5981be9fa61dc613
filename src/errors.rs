use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use thiserror::Error;

use crate::models::tier::StorageTier;

/// Failures raised by the tiered storage engine and its adapters.
#[derive(Debug, Error)]
pub enum StrataError {
    #[error("missing configuration for {tier} tier: {missing}")]
    Configuration { tier: StorageTier, missing: String },
    #[error("invalid path format: {path}")]
    InvalidPath { path: String },
    #[error("{what} not found")]
    NotFound { what: String },
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
    #[error("invalid {kind} value `{value}`")]
    InvalidValue { kind: &'static str, value: String },
    #[error("payload of {size} bytes exceeds the {max} byte limit")]
    PayloadTooLarge { size: u64, max: u64 },
    #[error("object store {operation} failed: {message}")]
    Transport {
        operation: &'static str,
        message: String,
    },
    #[error("metadata store error: {0}")]
    Metadata(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl StrataError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn transport(operation: &'static str, message: impl fmt::Display) -> Self {
        Self::Transport {
            operation,
            message: message.to_string(),
        }
    }
}

pub type StrataResult<T> = Result<T, StrataError>;

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<StrataError> for AppError {
    fn from(err: StrataError) -> Self {
        let status = match &err {
            StrataError::NotFound { .. } => StatusCode::NOT_FOUND,
            StrataError::InvalidOperation(_)
            | StrataError::InvalidPath { .. }
            | StrataError::InvalidValue { .. } => StatusCode::BAD_REQUEST,
            StrataError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            StrataError::Transport { .. } => StatusCode::BAD_GATEWAY,
            StrataError::Configuration { .. }
            | StrataError::Metadata(_)
            | StrataError::Sqlx(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %err, "request failed");
        }
        AppError::new(status, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_taxonomy_to_status_codes() {
        let cases = [
            (StrataError::not_found("file 7"), StatusCode::NOT_FOUND),
            (
                StrataError::InvalidOperation("cold".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                StrataError::InvalidPath {
                    path: "misc/a".into(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                StrataError::PayloadTooLarge { size: 10, max: 5 },
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
            (
                StrataError::transport("put", "connection reset"),
                StatusCode::BAD_GATEWAY,
            ),
            (
                StrataError::Configuration {
                    tier: StorageTier::Hot,
                    missing: "endpoint".into(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(AppError::from(err).status, expected);
        }
    }

    #[tokio::test]
    async fn response_body_carries_message_and_status() {
        let response = AppError::not_found("file 3 not found").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, json!({ "error": "file 3 not found", "status": 404 }));
    }

    #[test]
    fn configuration_error_names_tier() {
        let err = StrataError::Configuration {
            tier: StorageTier::Cold,
            missing: "cold_bucket".into(),
        };
        assert_eq!(
            err.to_string(),
            "missing configuration for COLD tier: cold_bucket"
        );
    }
}
