//! Migration plan types

use crate::models::{EntitySpec, FieldSpec, RelationshipSpec};
use crate::snapshot::{ChangeKind, FieldProperty};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Review priority of a step; `Critical` sorts first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Critical => write!(f, "critical"),
            Priority::High => write!(f, "high"),
            Priority::Medium => write!(f, "medium"),
            Priority::Low => write!(f, "low"),
        }
    }
}

/// Executable schema operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    CreateEntity {
        entity: EntitySpec,
    },
    DropEntity {
        entity: String,
    },
    AddField {
        entity: String,
        field: FieldSpec,
    },
    DropField {
        entity: String,
        field: String,
    },
    AlterField {
        entity: String,
        field: String,
        property: FieldProperty,
        from: Value,
        to: Value,
    },
    CreateRelationship {
        relationship: RelationshipSpec,
    },
    DropRelationship {
        name: String,
    },
}

impl Operation {
    pub fn is_destructive(&self) -> bool {
        matches!(
            self,
            Operation::DropEntity { .. } | Operation::DropField { .. } | Operation::DropRelationship { .. }
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::CreateEntity { entity } => {
                write!(f, "Create entity {} ({} fields)", entity.name, entity.field_count())
            }
            Operation::DropEntity { entity } => write!(f, "Drop entity {}", entity),
            Operation::AddField { entity, field } => write!(
                f,
                "Add field {}.{} ({}, {})",
                entity,
                field.name,
                field.field_type,
                if field.optional { "optional" } else { "required" }
            ),
            Operation::DropField { entity, field } => write!(f, "Drop field {}.{}", entity, field),
            Operation::AlterField {
                entity,
                field,
                property,
                from,
                to,
            } => write!(
                f,
                "Alter {}.{} {}: {} → {}",
                entity,
                field,
                property,
                plain(from),
                plain(to)
            ),
            Operation::CreateRelationship { relationship } => write!(
                f,
                "Create relationship {} ({} → {})",
                relationship.name, relationship.forward, relationship.reverse
            ),
            Operation::DropRelationship { name } => write!(f, "Drop relationship {}", name),
        }
    }
}

/// Scalar payloads without JSON string quoting
fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// One forward/inverse operation pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub id: String,
    pub description: String,
    pub kind: ChangeKind,
    pub entity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub priority: Priority,
    pub requires_downtime: bool,
    pub forward_operation: Operation,
    pub inverse_operation: Operation,
}

/// Review-ordered plan plus its rollback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationPlan {
    pub from_version: String,
    pub to_version: String,
    pub steps: Vec<Step>,
    pub estimated_duration_minutes: u32,
    pub requires_downtime: bool,
    /// Inverse operations of `steps`, last step first
    pub rollback_plan: Vec<Operation>,
}

impl MigrationPlan {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Number of steps at the given priority
    pub fn count(&self, priority: Priority) -> usize {
        self.steps.iter().filter(|s| s.priority == priority).count()
    }
}
