//! Comparison and migration planning route handlers

use crate::error::EngineResult;
use crate::migration::{MigrationPlan, MigrationPlanner};
use crate::models::SuccessResponse;
use crate::routes::snapshot::SnapshotSource;
use crate::snapshot::{Comparator, ComparisonResult, Snapshot};
use crate::state::SharedState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareRequest {
    /// Baseline; omitted or not found means an empty schema
    pub from: Option<SnapshotSource>,
    pub to: SnapshotSource,
    /// Keep only breaking changes in the response
    #[serde(default)]
    pub breaking_only: bool,
}

impl CompareRequest {
    fn resolve(&self, state: &SharedState) -> EngineResult<(Snapshot, Snapshot)> {
        let old = match &self.from {
            Some(source) => source.or_empty(state)?,
            None => Snapshot::empty("empty"),
        };
        let new = self.to.require(state)?;
        Ok((old, new))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResponse {
    pub comparison: ComparisonResult,
    pub plan: MigrationPlan,
}

/// Diff two snapshots
pub async fn compare(
    State(state): State<SharedState>,
    Json(payload): Json<CompareRequest>,
) -> EngineResult<Json<SuccessResponse<ComparisonResult>>> {
    let (old, new) = payload.resolve(&state)?;
    let mut result = Comparator::compare(&old, &new);
    if payload.breaking_only {
        result = result.breaking_only();
    }

    let message = format!(
        "{} changes, {} breaking",
        result.changes.len(),
        result.breaking_changes.len()
    );
    Ok(Json(SuccessResponse::new(message, Some(result))))
}

/// Diff two snapshots and plan the migration between them
pub async fn plan(
    State(state): State<SharedState>,
    Json(payload): Json<CompareRequest>,
) -> EngineResult<Json<SuccessResponse<PlanResponse>>> {
    let (old, new) = payload.resolve(&state)?;
    let comparison = Comparator::compare(&old, &new);
    let plan = MigrationPlanner::plan_verified(&comparison, &old, &new)?;

    info!(
        "Planned migration '{}' -> '{}': {} steps",
        plan.from_version,
        plan.to_version,
        plan.steps.len()
    );

    let message = format!(
        "{} steps, ~{} minutes{}",
        plan.steps.len(),
        plan.estimated_duration_minutes,
        if plan.requires_downtime { ", downtime required" } else { "" }
    );
    Ok(Json(SuccessResponse::new(
        message,
        Some(PlanResponse { comparison, plan }),
    )))
}
