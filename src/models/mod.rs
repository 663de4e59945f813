//! Data models
//!
//! The schema description consumed by the engine, the canonical schema
//! element types every Snapshot is built from, and the generic API envelope.

pub mod description;
pub mod schema;

pub use description::*;
pub use schema::*;

use serde::Serialize;

/// Generic success response
#[derive(Debug, Serialize)]
pub struct SuccessResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> SuccessResponse<T> {
    pub fn new(message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}
