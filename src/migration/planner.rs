//! Migration Planner
//!
//! Turns a comparison result into a review-ordered list of steps, each with
//! a forward and an inverse operation, plus the rollback sequence.
//!
//! Steps are sorted riskiest first so a reviewer sees destructive work
//! before additive work. This is not an execution order: anything applying
//! the plan must derive its own safe order.

use crate::error::{invalid_comparison, EngineResult};
use crate::migration::types::{MigrationPlan, Operation, Priority, Step};
use crate::models::{EntitySpec, FieldSpec, RelationshipSpec};
use crate::snapshot::{Change, ChangeKind, ComparisonResult, Snapshot};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

/// Planning estimate per step
pub const STEP_DURATION_MINUTES: u32 = 5;

pub struct MigrationPlanner;

impl MigrationPlanner {
    /// Build a plan from a comparison result
    pub fn plan(result: &ComparisonResult) -> EngineResult<MigrationPlan> {
        let mut steps = Vec::with_capacity(result.changes.len());
        for change in &result.changes {
            if let Some(step) = Self::step_for(change)? {
                steps.push(step);
            }
        }

        // sort_by_key is stable: ties keep comparator order
        steps.sort_by_key(|step| step.priority);
        for (i, step) in steps.iter_mut().enumerate() {
            step.id = format!("step-{}", i + 1);
        }

        let rollback_plan = steps
            .iter()
            .rev()
            .map(|step| step.inverse_operation.clone())
            .collect();
        let requires_downtime = steps.iter().any(|step| step.requires_downtime);
        let estimated_duration_minutes = STEP_DURATION_MINUTES * steps.len() as u32;

        debug!(
            "Planned '{}' -> '{}': {} steps, downtime: {}",
            result.from_version,
            result.to_version,
            steps.len(),
            requires_downtime
        );

        Ok(MigrationPlan {
            from_version: result.from_version.clone(),
            to_version: result.to_version.clone(),
            steps,
            estimated_duration_minutes,
            requires_downtime,
            rollback_plan,
        })
    }

    /// Like [`plan`](Self::plan), but first checks every change against the
    /// snapshots the result was computed from.
    pub fn plan_verified(
        result: &ComparisonResult,
        old: &Snapshot,
        new: &Snapshot,
    ) -> EngineResult<MigrationPlan> {
        for change in &result.changes {
            Self::verify_change(change, old, new)?;
        }
        Self::plan(result)
    }

    fn verify_change(change: &Change, old: &Snapshot, new: &Snapshot) -> EngineResult<()> {
        if let Some(name) = &change.relationship {
            if old.relationship(name).is_none() && new.relationship(name).is_none() {
                return Err(invalid_comparison(format!(
                    "Relationship '{}' exists in neither snapshot",
                    name
                )));
            }
            return Ok(());
        }

        let in_old = old.entity(&change.entity);
        let in_new = new.entity(&change.entity);
        if in_old.is_none() && in_new.is_none() {
            return Err(invalid_comparison(format!(
                "Entity '{}' exists in neither snapshot",
                change.entity
            )));
        }

        if let Some(field) = &change.field {
            let present = [in_old, in_new]
                .into_iter()
                .flatten()
                .any(|entity| entity.has_field(field));
            if !present {
                return Err(invalid_comparison(format!(
                    "Field '{}.{}' exists in neither snapshot",
                    change.entity, field
                )));
            }
        }

        Ok(())
    }

    /// Step template for one change; `None` when the change has no template
    fn step_for(change: &Change) -> EngineResult<Option<Step>> {
        if change.entity.is_empty() {
            return Err(invalid_comparison(format!(
                "{} change has no entity",
                change.kind
            )));
        }
        let entity = change.entity.clone();

        let (priority, requires_downtime, forward, inverse) = match change.kind {
            ChangeKind::FieldRemoved => {
                let field = Self::require_field(change)?;
                let spec: FieldSpec = Self::decode(change, change.old_value.as_ref(), "oldValue")?;
                Self::check_name(change, &spec.name, field)?;
                (
                    Priority::Critical,
                    true,
                    Operation::DropField {
                        entity: entity.clone(),
                        field: field.to_string(),
                    },
                    Operation::AddField {
                        entity: entity.clone(),
                        field: spec,
                    },
                )
            }
            ChangeKind::FieldAdded => {
                let field = Self::require_field(change)?;
                let spec: FieldSpec = Self::decode(change, change.new_value.as_ref(), "newValue")?;
                Self::check_name(change, &spec.name, field)?;
                (
                    Priority::Low,
                    false,
                    Operation::AddField {
                        entity: entity.clone(),
                        field: spec,
                    },
                    Operation::DropField {
                        entity: entity.clone(),
                        field: field.to_string(),
                    },
                )
            }
            ChangeKind::FieldModified => {
                let field = Self::require_field(change)?;
                let Some(property) = change.property else {
                    return Ok(None);
                };
                let from = Self::require_value(change, change.old_value.as_ref(), "oldValue")?;
                let to = Self::require_value(change, change.new_value.as_ref(), "newValue")?;
                let breaking = change.is_breaking();
                (
                    if breaking { Priority::High } else { Priority::Medium },
                    breaking,
                    Operation::AlterField {
                        entity: entity.clone(),
                        field: field.to_string(),
                        property,
                        from: from.clone(),
                        to: to.clone(),
                    },
                    Operation::AlterField {
                        entity: entity.clone(),
                        field: field.to_string(),
                        property,
                        from: to,
                        to: from,
                    },
                )
            }
            ChangeKind::EntityRemoved => {
                let spec: EntitySpec = Self::decode(change, change.old_value.as_ref(), "oldValue")?;
                Self::check_name(change, &spec.name, &entity)?;
                (
                    Priority::Critical,
                    true,
                    Operation::DropEntity {
                        entity: entity.clone(),
                    },
                    Operation::CreateEntity { entity: spec },
                )
            }
            ChangeKind::EntityAdded => {
                let spec: EntitySpec = Self::decode(change, change.new_value.as_ref(), "newValue")?;
                Self::check_name(change, &spec.name, &entity)?;
                (
                    Priority::Low,
                    false,
                    Operation::CreateEntity { entity: spec },
                    Operation::DropEntity {
                        entity: entity.clone(),
                    },
                )
            }
            ChangeKind::RelationshipRemoved => {
                let name = Self::require_relationship(change)?;
                let spec: RelationshipSpec =
                    Self::decode(change, change.old_value.as_ref(), "oldValue")?;
                Self::check_name(change, &spec.name, name)?;
                (
                    Priority::Critical,
                    true,
                    Operation::DropRelationship {
                        name: name.to_string(),
                    },
                    Operation::CreateRelationship { relationship: spec },
                )
            }
            ChangeKind::RelationshipAdded => {
                let name = Self::require_relationship(change)?;
                let spec: RelationshipSpec =
                    Self::decode(change, change.new_value.as_ref(), "newValue")?;
                Self::check_name(change, &spec.name, name)?;
                (
                    Priority::Low,
                    false,
                    Operation::CreateRelationship { relationship: spec },
                    Operation::DropRelationship {
                        name: name.to_string(),
                    },
                )
            }
        };

        Ok(Some(Step {
            id: String::new(),
            description: change.description.clone(),
            kind: change.kind,
            entity,
            field: change.field.clone(),
            priority,
            requires_downtime,
            forward_operation: forward,
            inverse_operation: inverse,
        }))
    }

    fn require_field(change: &Change) -> EngineResult<&str> {
        change.field.as_deref().ok_or_else(|| {
            invalid_comparison(format!("{} change on '{}' has no field", change.kind, change.entity))
        })
    }

    fn require_relationship(change: &Change) -> EngineResult<&str> {
        change.relationship.as_deref().ok_or_else(|| {
            invalid_comparison(format!(
                "{} change on '{}' has no relationship name",
                change.kind, change.entity
            ))
        })
    }

    fn require_value(change: &Change, value: Option<&Value>, slot: &str) -> EngineResult<Value> {
        value.cloned().ok_or_else(|| {
            invalid_comparison(format!("{} change on '{}' has no {}", change.kind, change.target(), slot))
        })
    }

    fn decode<T: DeserializeOwned>(change: &Change, value: Option<&Value>, slot: &str) -> EngineResult<T> {
        let value = Self::require_value(change, value, slot)?;
        serde_json::from_value(value).map_err(|e| {
            invalid_comparison(format!(
                "{} change on '{}' has an undecodable {}: {}",
                change.kind,
                change.target(),
                slot,
                e
            ))
        })
    }

    fn check_name(change: &Change, decoded: &str, expected: &str) -> EngineResult<()> {
        if decoded != expected {
            return Err(invalid_comparison(format!(
                "{} change names '{}' but its payload describes '{}'",
                change.kind, expected, decoded
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Cardinality, FieldDefinition, LinkSide, SchemaDescription};
    use crate::snapshot::{Comparator, FieldProperty, Impact, SnapshotBuilder};
    use pretty_assertions::assert_eq;

    fn snapshot(version: &str, description: SchemaDescription) -> Snapshot {
        SnapshotBuilder::build(&description, version).unwrap()
    }

    fn before_after() -> (Snapshot, Snapshot) {
        let old = snapshot(
            "v1",
            SchemaDescription::new()
                .with_entity(
                    "orders",
                    [
                        ("total", FieldDefinition::typed("number")),
                        ("notes", FieldDefinition::typed("string").optional()),
                    ],
                )
                .with_entity("customers", [("email", FieldDefinition::typed("string"))])
                .with_entity("legacy", [("data", FieldDefinition::typed("any"))])
                .with_link(
                    "orderCustomer",
                    LinkSide::new("orders", Cardinality::One, "customer"),
                    LinkSide::new("customers", Cardinality::Many, "orders"),
                ),
        );
        let new = snapshot(
            "v2",
            SchemaDescription::new()
                .with_entity(
                    "orders",
                    [
                        ("notes", FieldDefinition::typed("string")),
                        ("status", FieldDefinition::typed("string").indexed()),
                    ],
                )
                .with_entity("customers", [("email", FieldDefinition::typed("string"))])
                .with_entity("stores", [("name", FieldDefinition::typed("string"))]),
        );
        (old, new)
    }

    #[test]
    fn test_empty_comparison_gives_empty_plan() {
        let (old, _) = before_after();
        let plan = MigrationPlanner::plan(&Comparator::compare(&old, &old)).unwrap();
        assert!(plan.is_empty());
        assert!(plan.rollback_plan.is_empty());
        assert!(!plan.requires_downtime);
        assert_eq!(plan.estimated_duration_minutes, 0);
    }

    #[test]
    fn test_steps_sorted_by_priority() {
        let (old, new) = before_after();
        let result = Comparator::compare(&old, &new);
        let plan = MigrationPlanner::plan(&result).unwrap();

        let summary: Vec<_> = plan
            .steps
            .iter()
            .map(|s| (s.id.as_str(), s.kind, s.priority))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("step-1", ChangeKind::EntityRemoved, Priority::Critical),
                ("step-2", ChangeKind::FieldRemoved, Priority::Critical),
                ("step-3", ChangeKind::RelationshipRemoved, Priority::Critical),
                ("step-4", ChangeKind::FieldModified, Priority::High),
                ("step-5", ChangeKind::EntityAdded, Priority::Low),
                ("step-6", ChangeKind::FieldAdded, Priority::Low),
            ]
        );
        assert!(plan.requires_downtime);
        assert_eq!(plan.estimated_duration_minutes, 30);
        assert_eq!(plan.count(Priority::Critical), 3);
    }

    #[test]
    fn test_rollback_is_reversed_inverses() {
        let (old, new) = before_after();
        let plan = MigrationPlanner::plan(&Comparator::compare(&old, &new)).unwrap();

        let n = plan.steps.len();
        assert_eq!(plan.rollback_plan.len(), n);
        for (i, op) in plan.rollback_plan.iter().enumerate() {
            assert_eq!(op, &plan.steps[n - 1 - i].inverse_operation);
        }
    }

    #[test]
    fn test_inverse_restores_removed_spec() {
        let (old, new) = before_after();
        let plan = MigrationPlanner::plan(&Comparator::compare(&old, &new)).unwrap();

        let drop_total = plan
            .steps
            .iter()
            .find(|s| s.kind == ChangeKind::FieldRemoved)
            .unwrap();
        assert_eq!(
            drop_total.inverse_operation,
            Operation::AddField {
                entity: "orders".to_string(),
                field: old.entity("orders").unwrap().field("total").unwrap().clone(),
            }
        );

        let drop_legacy = plan
            .steps
            .iter()
            .find(|s| s.kind == ChangeKind::EntityRemoved)
            .unwrap();
        assert_eq!(
            drop_legacy.inverse_operation,
            Operation::CreateEntity {
                entity: old.entity("legacy").unwrap().clone()
            }
        );
    }

    #[test]
    fn test_non_breaking_modification_is_medium() {
        let old = snapshot(
            "v1",
            SchemaDescription::new().with_entity("orders", [("notes", FieldDefinition::typed("string"))]),
        );
        let new = snapshot(
            "v2",
            SchemaDescription::new()
                .with_entity("orders", [("notes", FieldDefinition::typed("string").optional())]),
        );

        let plan = MigrationPlanner::plan(&Comparator::compare(&old, &new)).unwrap();
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.steps[0].priority, Priority::Medium);
        assert!(!plan.requires_downtime);
        assert_eq!(
            plan.steps[0].inverse_operation,
            Operation::AlterField {
                entity: "orders".to_string(),
                field: "notes".to_string(),
                property: FieldProperty::Optional,
                from: Value::from(true),
                to: Value::from(false),
            }
        );
    }

    fn bare_change(kind: ChangeKind) -> Change {
        Change {
            kind,
            entity: "orders".to_string(),
            field: Some("total".to_string()),
            relationship: None,
            property: None,
            old_value: None,
            new_value: None,
            description: "hand-built".to_string(),
            impact: Impact::Breaking,
        }
    }

    fn result_with(changes: Vec<Change>) -> ComparisonResult {
        let empty = Snapshot::empty("v0");
        ComparisonResult::from_changes(&empty, &empty, changes)
    }

    #[test]
    fn test_modification_without_property_is_skipped() {
        let mut change = bare_change(ChangeKind::FieldModified);
        change.old_value = Some(Value::from(true));
        change.new_value = Some(Value::from(false));

        let plan = MigrationPlanner::plan(&result_with(vec![change])).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_invalid_changes_fail_fast() {
        let mut no_entity = bare_change(ChangeKind::FieldRemoved);
        no_entity.entity.clear();
        assert!(MigrationPlanner::plan(&result_with(vec![no_entity])).is_err());

        let mut no_field = bare_change(ChangeKind::FieldAdded);
        no_field.field = None;
        assert!(MigrationPlanner::plan(&result_with(vec![no_field])).is_err());

        let no_payload = bare_change(ChangeKind::FieldRemoved);
        assert!(MigrationPlanner::plan(&result_with(vec![no_payload])).is_err());

        let mut bad_payload = bare_change(ChangeKind::FieldRemoved);
        bad_payload.old_value = Some(Value::from("not a field"));
        let err = MigrationPlanner::plan(&result_with(vec![bad_payload])).unwrap_err();
        assert_eq!(err.code(), "COMPARISON_RESULT_INVALID");

        let mut no_relationship = bare_change(ChangeKind::RelationshipAdded);
        no_relationship.field = None;
        assert!(MigrationPlanner::plan(&result_with(vec![no_relationship])).is_err());
    }

    #[test]
    fn test_plan_verified_rejects_unknown_elements() {
        let (old, new) = before_after();
        let mut result = Comparator::compare(&old, &new);
        assert!(MigrationPlanner::plan_verified(&result, &old, &new).is_ok());

        let mut ghost = bare_change(ChangeKind::FieldRemoved);
        ghost.field = Some("ghost".to_string());
        ghost.old_value = Some(serde_json::to_value(FieldSpec::required("ghost", crate::models::FieldType::Number)).unwrap());
        result.changes.push(ghost);

        assert!(MigrationPlanner::plan(&result).is_ok());
        let err = MigrationPlanner::plan_verified(&result, &old, &new).unwrap_err();
        assert!(err.to_string().contains("orders.ghost"));
    }

    #[test]
    fn test_plan_verified_rejects_unknown_entity() {
        let (old, new) = before_after();
        let mut result = Comparator::compare(&old, &new);

        let mut ghost = bare_change(ChangeKind::EntityRemoved);
        ghost.entity = "ghosts".to_string();
        ghost.field = None;
        ghost.old_value = Some(serde_json::to_value(EntitySpec::new("ghosts")).unwrap());
        result.changes.push(ghost);

        assert!(MigrationPlanner::plan(&result).is_ok());
        let err = MigrationPlanner::plan_verified(&result, &old, &new).unwrap_err();
        assert_eq!(err.code(), "COMPARISON_RESULT_INVALID");
        assert!(err.to_string().contains("ghosts"));
    }

    #[test]
    fn test_changed_relationship_is_dropped_then_recreated() {
        let linked = |reverse: Cardinality| {
            SchemaDescription::new()
                .with_entity("orders", [("total", FieldDefinition::typed("number"))])
                .with_entity("customers", [("email", FieldDefinition::typed("string"))])
                .with_link(
                    "orderCustomer",
                    LinkSide::new("orders", Cardinality::One, "customer"),
                    LinkSide::new("customers", reverse, "orders"),
                )
        };
        let old = snapshot("v1", linked(Cardinality::Many));
        let new = snapshot("v2", linked(Cardinality::One));

        let result = Comparator::compare(&old, &new);
        let plan = MigrationPlanner::plan_verified(&result, &old, &new).unwrap();

        let summary: Vec<_> = plan.steps.iter().map(|s| (s.kind, s.priority)).collect();
        assert_eq!(
            summary,
            vec![
                (ChangeKind::RelationshipRemoved, Priority::Critical),
                (ChangeKind::RelationshipAdded, Priority::Low),
            ]
        );
        assert!(plan.requires_downtime);

        let old_spec = old.relationship("orderCustomer").unwrap().clone();
        assert_eq!(
            plan.rollback_plan,
            vec![
                Operation::DropRelationship {
                    name: "orderCustomer".to_string()
                },
                Operation::CreateRelationship {
                    relationship: old_spec
                },
            ]
        );
    }
}
