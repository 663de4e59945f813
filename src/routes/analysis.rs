//! Consistency analysis route handlers

use crate::consistency::{
    default_rules, AnalysisReport, ConsistencyAnalyzer, EntityReport, FieldValidation,
    FieldValidator, Rule,
};
use crate::error::{validation_error, EngineResult};
use crate::models::SuccessResponse;
use crate::routes::snapshot::SnapshotSource;
use crate::state::SharedState;
use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[serde(flatten)]
    pub source: SnapshotSource,
    /// Keep only high severity findings
    #[serde(default)]
    pub critical_only: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateFieldRequest {
    /// `name:type`
    pub field: String,
    pub entity: Option<String>,
}

/// Analyze a whole snapshot
pub async fn analyze(
    State(state): State<SharedState>,
    Json(payload): Json<AnalyzeRequest>,
) -> EngineResult<Json<SuccessResponse<AnalysisReport>>> {
    let snapshot = payload.source.require(&state)?;
    let mut report = ConsistencyAnalyzer::analyze(&snapshot);
    if payload.critical_only {
        report = report.critical_only();
    }

    let message = if report.is_healthy() {
        format!("{} issues, no high severity findings", report.summary.total)
    } else {
        format!("{} issues, {} high severity", report.summary.total, report.summary.high)
    };

    Ok(Json(SuccessResponse::new(message, Some(report))))
}

/// Analyze one entity of a snapshot
pub async fn analyze_entity(
    State(state): State<SharedState>,
    Path(entity): Path<String>,
    Json(payload): Json<AnalyzeRequest>,
) -> EngineResult<Json<SuccessResponse<EntityReport>>> {
    let snapshot = payload.source.require(&state)?;
    let mut report = ConsistencyAnalyzer::analyze_entity(&snapshot, &entity)?;
    if payload.critical_only {
        report = report.critical_only();
    }

    debug!("Entity '{}': {} findings", entity, report.inconsistencies.len());

    Ok(Json(SuccessResponse::new(
        format!("Entity '{}' analyzed", entity),
        Some(report),
    )))
}

/// Validate a single `name:type` pair
pub async fn validate_field(
    Json(payload): Json<ValidateFieldRequest>,
) -> EngineResult<Json<SuccessResponse<FieldValidation>>> {
    if payload.field.trim().is_empty() {
        return Err(validation_error("field is required"));
    }

    let result = FieldValidator::validate_on(payload.entity.as_deref(), &payload.field);
    let message = if result.valid {
        "Field is valid".to_string()
    } else {
        format!("{} issues found", result.issues.len())
    };

    Ok(Json(SuccessResponse::new(message, Some(result))))
}

/// List the consistency rule catalog
pub async fn list_rules() -> Json<SuccessResponse<Vec<Rule>>> {
    Json(SuccessResponse::new("Consistency rules", Some(default_rules())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FieldDefinition, SchemaDescription};
    use crate::state::AppState;
    use std::sync::Arc;
    use tokio_test::block_on;

    fn request(critical_only: bool) -> AnalyzeRequest {
        AnalyzeRequest {
            source: SnapshotSource {
                description: Some(SchemaDescription::new().with_entity(
                    "products",
                    [
                        ("brand", FieldDefinition::typed("string")),
                        ("meta", FieldDefinition::typed("any")),
                    ],
                )),
                ..Default::default()
            },
            critical_only,
        }
    }

    #[test]
    fn test_analyze_inline_description() {
        let state = Arc::new(AppState::in_memory());

        let full = block_on(analyze(State(state.clone()), Json(request(false)))).unwrap();
        assert_eq!(full.0.data.unwrap().summary.total, 2);

        let critical = block_on(analyze(State(state), Json(request(true)))).unwrap();
        assert_eq!(critical.0.data.unwrap().summary.total, 1);
    }

    #[test]
    fn test_analyze_entity_not_found() {
        let state = Arc::new(AppState::in_memory());
        let err = block_on(analyze_entity(
            State(state),
            Path("orders".to_string()),
            Json(request(false)),
        ))
        .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[test]
    fn test_request_shape() {
        let payload: AnalyzeRequest = serde_json::from_str(
            r#"{ "snapshotKey": "v1", "criticalOnly": true }"#,
        )
        .unwrap();
        assert_eq!(payload.source.snapshot_key.as_deref(), Some("v1"));
        assert!(payload.critical_only);
    }

    #[test]
    fn test_validate_field() {
        let response = block_on(validate_field(Json(ValidateFieldRequest {
            field: "createdat:date".to_string(),
            entity: None,
        })))
        .unwrap();
        let result = response.0.data.unwrap();
        assert!(!result.valid);
        assert_eq!(result.issues.len(), 1);

        let err = block_on(validate_field(Json(ValidateFieldRequest {
            field: "  ".to_string(),
            entity: None,
        })))
        .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }
}
