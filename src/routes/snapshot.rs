//! Snapshot API Routes
//!
//! Create, list and fetch persisted snapshots, plus the shared way every
//! other route resolves "which snapshot do you mean".

use crate::consistency::validator::flatten_errors;
use crate::error::{not_found_error, validation_error, EngineResult};
use crate::models::{SchemaDescription, SuccessResponse};
use crate::snapshot::store::{dated_key, validate_key};
use crate::snapshot::{Snapshot, SnapshotBuilder, SnapshotMetadata};
use crate::state::SharedState;
use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use tracing::{info, warn};
use validator::{Validate, ValidationError};

// ==================== Request Types ====================

/// Either a stored snapshot or an inline description to build one from
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSource {
    pub snapshot_key: Option<String>,
    pub description: Option<SchemaDescription>,
    /// Version label for inline descriptions
    pub version: Option<String>,
}

impl SnapshotSource {
    /// Resolve to a snapshot; a stored key that does not exist is `None`
    pub fn load(&self, state: &SharedState) -> EngineResult<Option<Snapshot>> {
        match (&self.snapshot_key, &self.description) {
            (Some(_), Some(_)) => Err(validation_error(
                "Provide either snapshotKey or description, not both",
            )),
            (Some(key), None) => {
                validate_key(key)?;
                state.store.load(key)
            }
            (None, Some(description)) => {
                let version = self.version.as_deref().unwrap_or("inline");
                SnapshotBuilder::build(description, version).map(Some)
            }
            (None, None) => Err(validation_error("Provide a snapshotKey or a description")),
        }
    }

    /// Resolve to a snapshot, failing when a stored key does not exist
    pub fn require(&self, state: &SharedState) -> EngineResult<Snapshot> {
        self.load(state)?.ok_or_else(|| {
            not_found_error(format!(
                "Snapshot '{}' not found",
                self.snapshot_key.as_deref().unwrap_or_default()
            ))
        })
    }

    /// Resolve to a snapshot, treating a missing stored key as an empty baseline
    pub fn or_empty(&self, state: &SharedState) -> EngineResult<Snapshot> {
        match self.load(state)? {
            Some(snapshot) => Ok(snapshot),
            None => {
                let key = self.snapshot_key.as_deref().unwrap_or_default();
                warn!("Snapshot '{}' not found, comparing against an empty baseline", key);
                Ok(Snapshot::empty(key))
            }
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSnapshotRequest {
    #[validate(length(min = 1, max = 100, message = "Snapshot name must be between 1 and 100 characters"))]
    #[validate(custom(function = "validate_snapshot_name"))]
    pub name: String,
    pub description: SchemaDescription,
    /// Defaults to the name
    pub version: Option<String>,
    /// Append a timestamp to the key
    #[serde(default)]
    pub dated: bool,
}

fn validate_snapshot_name(name: &str) -> Result<(), ValidationError> {
    if let Err(e) = validate_key(name) {
        let mut err = ValidationError::new("invalid_snapshot_name");
        err.message = Some(e.to_string().into());
        return Err(err);
    }
    Ok(())
}

// ==================== Handlers ====================

/// Build a snapshot from a description and persist it
pub async fn create_snapshot(
    State(state): State<SharedState>,
    Json(payload): Json<CreateSnapshotRequest>,
) -> EngineResult<Json<SuccessResponse<SnapshotMetadata>>> {
    payload
        .validate()
        .map_err(|e| validation_error(flatten_errors(&e).join("; ")))?;

    let key = if payload.dated {
        dated_key(&payload.name)
    } else {
        payload.name.clone()
    };
    let version = payload.version.as_deref().unwrap_or(&payload.name);

    let snapshot = SnapshotBuilder::build(&payload.description, version)?;
    let metadata = state.store.save(&key, &snapshot)?;

    info!("Created snapshot '{}' ({} entities)", key, metadata.entity_count);

    Ok(Json(SuccessResponse::new(
        format!("Snapshot '{}' created", key),
        Some(metadata),
    )))
}

/// List stored snapshots, newest first
pub async fn list_snapshots(
    State(state): State<SharedState>,
) -> EngineResult<Json<SuccessResponse<Vec<SnapshotMetadata>>>> {
    let snapshots = state.store.list()?;
    Ok(Json(SuccessResponse::new(
        format!("{} snapshots", snapshots.len()),
        Some(snapshots),
    )))
}

/// Fetch one stored snapshot
pub async fn get_snapshot(
    State(state): State<SharedState>,
    Path(key): Path<String>,
) -> EngineResult<Json<SuccessResponse<Snapshot>>> {
    validate_key(&key)?;
    let snapshot = state
        .store
        .load(&key)?
        .ok_or_else(|| not_found_error(format!("Snapshot '{}' not found", key)))?;

    Ok(Json(SuccessResponse::new("Snapshot loaded", Some(snapshot))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FieldDefinition;
    use crate::state::AppState;
    use std::sync::Arc;
    use tokio_test::block_on;

    fn description() -> SchemaDescription {
        SchemaDescription::new().with_entity("orders", [("total", FieldDefinition::typed("number"))])
    }

    fn create_request(name: &str) -> CreateSnapshotRequest {
        CreateSnapshotRequest {
            name: name.to_string(),
            description: description(),
            version: None,
            dated: false,
        }
    }

    #[test]
    fn test_create_then_get() {
        let state = Arc::new(AppState::in_memory());

        let created = block_on(create_snapshot(State(state.clone()), Json(create_request("v1")))).unwrap();
        let metadata = created.0.data.unwrap();
        assert_eq!(metadata.key, "v1");
        assert_eq!(metadata.version, "v1");
        assert_eq!(metadata.field_count, 1);

        let fetched = block_on(get_snapshot(State(state.clone()), Path("v1".to_string()))).unwrap();
        assert_eq!(fetched.0.data.unwrap().checksum(), metadata.checksum);

        let listed = block_on(list_snapshots(State(state))).unwrap();
        assert_eq!(listed.0.data.unwrap().len(), 1);
    }

    #[test]
    fn test_rejects_bad_names() {
        let state = Arc::new(AppState::in_memory());
        let err = block_on(create_snapshot(State(state), Json(create_request("../escape")))).unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_missing_snapshot() {
        let state = Arc::new(AppState::in_memory());
        let err = block_on(get_snapshot(State(state.clone()), Path("nope".to_string()))).unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");

        let source = SnapshotSource {
            snapshot_key: Some("nope".to_string()),
            ..Default::default()
        };
        assert!(source.require(&state).is_err());
        assert!(source.or_empty(&state).unwrap().entities().is_empty());
    }

    #[test]
    fn test_source_needs_exactly_one_input() {
        let state = Arc::new(AppState::in_memory());
        assert!(SnapshotSource::default().load(&state).is_err());

        let both = SnapshotSource {
            snapshot_key: Some("v1".to_string()),
            description: Some(description()),
            version: None,
        };
        assert!(both.load(&state).is_err());
    }
}
