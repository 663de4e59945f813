//! Error handling module
//!
//! Provides the unified error type for the engine, the snapshot store and
//! the HTTP surface. Analyzer findings and diff changes are data, never
//! errors; only contract violations and I/O failures end up here.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Engine-wide error type
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Relationship '{relationship}' references unknown entity '{entity}'")]
    MalformedRelationship { relationship: String, entity: String },

    #[error("Invalid comparison result: {0}")]
    ComparisonResultInvalid(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Snapshot '{key}' is corrupt: {reason}")]
    CorruptSnapshot { key: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl EngineError {
    /// Stable machine-readable code for the error
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::MalformedRelationship { .. } => "MALFORMED_RELATIONSHIP",
            EngineError::ComparisonResultInvalid(_) => "COMPARISON_RESULT_INVALID",
            EngineError::NotFound(_) => "NOT_FOUND",
            EngineError::Validation(_) => "VALIDATION_ERROR",
            EngineError::CorruptSnapshot { .. } => "CORRUPT_SNAPSHOT",
            EngineError::Storage(_) => "STORAGE_ERROR",
            EngineError::Serialization(_) => "SERIALIZATION_ERROR",
            EngineError::Config(_) => "CONFIG_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            EngineError::MalformedRelationship { .. } | EngineError::Validation(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::Serialization(_) => StatusCode::BAD_REQUEST,
            EngineError::ComparisonResultInvalid(_)
            | EngineError::CorruptSnapshot { .. }
            | EngineError::Storage(_)
            | EngineError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("{}: {}", self.code(), self);
        }

        let body = Json(ErrorResponse {
            success: false,
            message: self.to_string(),
            code: Some(self.code().to_string()),
        });

        (status, body).into_response()
    }
}

/// Result type alias used across the engine
pub type EngineResult<T> = Result<T, EngineError>;

/// Helper function to create a validation error
pub fn validation_error(msg: impl Into<String>) -> EngineError {
    EngineError::Validation(msg.into())
}

/// Helper function to create a not found error
pub fn not_found_error(msg: impl Into<String>) -> EngineError {
    EngineError::NotFound(msg.into())
}

/// Helper function to flag a comparison/planner contract violation
pub fn invalid_comparison(msg: impl Into<String>) -> EngineError {
    EngineError::ComparisonResultInvalid(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(not_found_error("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(validation_error("x").status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            invalid_comparison("x").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_malformed_relationship_message() {
        let err = EngineError::MalformedRelationship {
            relationship: "orderCustomer".to_string(),
            entity: "customers".to_string(),
        };
        assert_eq!(err.code(), "MALFORMED_RELATIONSHIP");
        assert!(err.to_string().contains("customers"));
    }
}
