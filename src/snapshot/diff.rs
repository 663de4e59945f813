//! Schema Diff Engine
//!
//! The comparison engine that detects changes between two snapshots and
//! tags each one with its compatibility impact. This is the "git diff" for
//! the data model.
//!
//! Renames are never inferred: a renamed field always shows up as one
//! `field_removed` plus one `field_added`.

use crate::models::{EntitySpec, FieldSpec, FieldType, RelationshipSpec};
use crate::snapshot::builder::Snapshot;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Kind of structural change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    EntityAdded,
    EntityRemoved,
    FieldAdded,
    FieldRemoved,
    FieldModified,
    RelationshipAdded,
    RelationshipRemoved,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::EntityAdded => "entity_added",
            ChangeKind::EntityRemoved => "entity_removed",
            ChangeKind::FieldAdded => "field_added",
            ChangeKind::FieldRemoved => "field_removed",
            ChangeKind::FieldModified => "field_modified",
            ChangeKind::RelationshipAdded => "relationship_added",
            ChangeKind::RelationshipRemoved => "relationship_removed",
        }
    }

    pub fn is_field_level(&self) -> bool {
        matches!(
            self,
            ChangeKind::FieldAdded | ChangeKind::FieldRemoved | ChangeKind::FieldModified
        )
    }

    pub fn is_relationship_level(&self) -> bool {
        matches!(self, ChangeKind::RelationshipAdded | ChangeKind::RelationshipRemoved)
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compatibility impact of a change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Impact {
    /// Requires a coordinated migration
    Breaking,
    /// Safe to apply without migration
    NonBreaking,
    /// Purely additive
    Enhancement,
}

impl Impact {
    pub fn as_str(&self) -> &'static str {
        match self {
            Impact::Breaking => "breaking",
            Impact::NonBreaking => "non_breaking",
            Impact::Enhancement => "enhancement",
        }
    }
}

impl fmt::Display for Impact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field property compared by `field_modified`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldProperty {
    Type,
    Optional,
    Indexed,
    Unique,
}

impl fmt::Display for FieldProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldProperty::Type => "type",
            FieldProperty::Optional => "optional",
            FieldProperty::Indexed => "indexed",
            FieldProperty::Unique => "unique",
        };
        f.write_str(name)
    }
}

/// A single structural difference between two snapshots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    pub kind: ChangeKind,
    pub entity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<FieldProperty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<Value>,
    pub description: String,
    pub impact: Impact,
}

impl Change {
    pub fn is_breaking(&self) -> bool {
        self.impact == Impact::Breaking
    }

    /// `entity.field`, `entity` or the relationship name
    pub fn target(&self) -> String {
        match (&self.field, &self.relationship) {
            (Some(field), _) => format!("{}.{}", self.entity, field),
            (None, Some(name)) => name.clone(),
            (None, None) => self.entity.clone(),
        }
    }
}

/// Per-kind tally of changes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSummary {
    pub entities_added: usize,
    pub entities_removed: usize,
    pub fields_added: usize,
    pub fields_removed: usize,
    pub fields_modified: usize,
    pub relationships_added: usize,
    pub relationships_removed: usize,
    pub total_changes: usize,
}

impl ChangeSummary {
    pub fn count(&self, kind: ChangeKind) -> usize {
        match kind {
            ChangeKind::EntityAdded => self.entities_added,
            ChangeKind::EntityRemoved => self.entities_removed,
            ChangeKind::FieldAdded => self.fields_added,
            ChangeKind::FieldRemoved => self.fields_removed,
            ChangeKind::FieldModified => self.fields_modified,
            ChangeKind::RelationshipAdded => self.relationships_added,
            ChangeKind::RelationshipRemoved => self.relationships_removed,
        }
    }
}

/// Complete comparison result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    pub from_version: String,
    pub to_version: String,
    pub from_checksum: String,
    pub to_checksum: String,
    pub changes: Vec<Change>,
    pub summary_counts: ChangeSummary,
    /// Breaking subset of `changes`, same relative order
    pub breaking_changes: Vec<Change>,
    pub migration_required: bool,
}

impl ComparisonResult {
    /// Assemble a result, deriving counts and the breaking subset from `changes`
    pub fn from_changes(old: &Snapshot, new: &Snapshot, changes: Vec<Change>) -> Self {
        let summary_counts = Comparator::calculate_summary(&changes);
        let breaking_changes: Vec<Change> = changes.iter().filter(|c| c.is_breaking()).cloned().collect();
        let migration_required = !breaking_changes.is_empty();

        Self {
            from_version: old.version().to_string(),
            to_version: new.version().to_string(),
            from_checksum: old.checksum().to_string(),
            to_checksum: new.checksum().to_string(),
            changes,
            summary_counts,
            breaking_changes,
            migration_required,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Copy of this result keeping only breaking changes
    pub fn breaking_only(&self) -> Self {
        let changes = self.breaking_changes.clone();
        Self {
            summary_counts: Comparator::calculate_summary(&changes),
            changes,
            ..self.clone()
        }
    }
}

/// Type changes that never lose data
const WIDENING_CONVERSIONS: &[(FieldType, FieldType)] = &[
    (FieldType::Dynamic, FieldType::Json),
    (FieldType::String, FieldType::Json),
];

/// The comparator that diffs two snapshots
pub struct Comparator;

impl Comparator {
    /// Compare two snapshots and return all differences
    pub fn compare(old: &Snapshot, new: &Snapshot) -> ComparisonResult {
        let mut changes = Vec::new();
        Self::diff_entities(old.entities(), new.entities(), &mut changes);
        Self::diff_relationships(old.relationships(), new.relationships(), &mut changes);

        let result = ComparisonResult::from_changes(old, new, changes);

        debug!(
            "Compared '{}' -> '{}': {} changes, {} breaking",
            result.from_version,
            result.to_version,
            result.changes.len(),
            result.breaking_changes.len()
        );

        result
    }

    fn diff_entities(
        old: &BTreeMap<String, EntitySpec>,
        new: &BTreeMap<String, EntitySpec>,
        changes: &mut Vec<Change>,
    ) {
        // Added entities
        for (name, entity) in new.iter().filter(|(name, _)| !old.contains_key(*name)) {
            changes.push(Change {
                kind: ChangeKind::EntityAdded,
                entity: name.clone(),
                field: None,
                relationship: None,
                property: None,
                old_value: None,
                new_value: Some(Self::to_value(entity)),
                description: format!("Entity {} created with {} fields", name, entity.field_count()),
                impact: Impact::Enhancement,
            });
        }

        // Removed entities
        for (name, entity) in old.iter().filter(|(name, _)| !new.contains_key(*name)) {
            changes.push(Change {
                kind: ChangeKind::EntityRemoved,
                entity: name.clone(),
                field: None,
                relationship: None,
                property: None,
                old_value: Some(Self::to_value(entity)),
                new_value: None,
                description: format!(
                    "Entity {} removed ({} fields, all records unreachable)",
                    name,
                    entity.field_count()
                ),
                impact: Impact::Breaking,
            });
        }

        // Entities present in both
        for (name, old_entity) in old {
            if let Some(new_entity) = new.get(name) {
                Self::diff_fields(old_entity, new_entity, changes);
            }
        }
    }

    fn diff_fields(old: &EntitySpec, new: &EntitySpec, changes: &mut Vec<Change>) {
        let entity = &old.name;

        for (name, field) in new.fields.iter().filter(|(name, _)| !old.has_field(name)) {
            changes.push(Change {
                kind: ChangeKind::FieldAdded,
                entity: entity.clone(),
                field: Some(name.clone()),
                relationship: None,
                property: None,
                old_value: None,
                new_value: Some(Self::to_value(field)),
                description: format!(
                    "Field {}.{} added (type: {}, optional: {})",
                    entity, name, field.field_type, field.optional
                ),
                impact: Impact::Enhancement,
            });
        }

        for (name, field) in old.fields.iter().filter(|(name, _)| !new.has_field(name)) {
            changes.push(Change {
                kind: ChangeKind::FieldRemoved,
                entity: entity.clone(),
                field: Some(name.clone()),
                relationship: None,
                property: None,
                old_value: Some(Self::to_value(field)),
                new_value: None,
                description: format!(
                    "Field {}.{} removed (type: {}, data lost)",
                    entity, name, field.field_type
                ),
                impact: Impact::Breaking,
            });
        }

        for (name, old_field) in &old.fields {
            if let Some(new_field) = new.field(name) {
                Self::compare_fields(entity, old_field, new_field, changes);
            }
        }
    }

    /// One `field_modified` per differing property
    fn compare_fields(entity: &str, from: &FieldSpec, to: &FieldSpec, changes: &mut Vec<Change>) {
        let modified = |property: FieldProperty, old: Value, new: Value, detail: String, impact: Impact| Change {
            kind: ChangeKind::FieldModified,
            entity: entity.to_string(),
            field: Some(from.name.clone()),
            relationship: None,
            property: Some(property),
            old_value: Some(old),
            new_value: Some(new),
            description: format!("Field {}.{} modified: {}", entity, from.name, detail),
            impact,
        };

        if from.field_type != to.field_type {
            changes.push(modified(
                FieldProperty::Type,
                Value::from(from.field_type.as_str()),
                Value::from(to.field_type.as_str()),
                format!("type {} → {}", from.field_type, to.field_type),
                Self::classify_type_change(from.field_type, to.field_type),
            ));
        }

        if from.optional != to.optional {
            let (detail, impact) = if to.optional {
                ("now optional", Impact::NonBreaking)
            } else {
                ("now required", Impact::Breaking)
            };
            changes.push(modified(
                FieldProperty::Optional,
                Value::from(from.optional),
                Value::from(to.optional),
                detail.to_string(),
                impact,
            ));
        }

        if from.indexed != to.indexed {
            let detail = if to.indexed { "index added" } else { "index removed" };
            changes.push(modified(
                FieldProperty::Indexed,
                Value::from(from.indexed),
                Value::from(to.indexed),
                detail.to_string(),
                Impact::Enhancement,
            ));
        }

        if from.unique != to.unique {
            let (detail, impact) = if to.unique {
                ("unique constraint added", Impact::Breaking)
            } else {
                ("unique constraint removed", Impact::NonBreaking)
            };
            changes.push(modified(
                FieldProperty::Unique,
                Value::from(from.unique),
                Value::from(to.unique),
                detail.to_string(),
                impact,
            ));
        }
    }

    fn diff_relationships(
        old: &BTreeMap<String, RelationshipSpec>,
        new: &BTreeMap<String, RelationshipSpec>,
        changes: &mut Vec<Change>,
    ) {
        // A relationship whose content changed is reported as removed + added
        let differs = |name: &String, spec: &RelationshipSpec, other: &BTreeMap<String, RelationshipSpec>| {
            !matches!(other.get(name), Some(o) if o == spec)
        };

        for (name, spec) in new.iter().filter(|&(name, spec)| differs(name, spec, old)) {
            changes.push(Change {
                kind: ChangeKind::RelationshipAdded,
                entity: spec.forward.entity.clone(),
                field: None,
                relationship: Some(name.clone()),
                property: None,
                old_value: None,
                new_value: Some(Self::to_value(spec)),
                description: format!(
                    "Relationship {} added: {} → {}",
                    name, spec.forward, spec.reverse
                ),
                impact: Impact::Enhancement,
            });
        }

        for (name, spec) in old.iter().filter(|&(name, spec)| differs(name, spec, new)) {
            changes.push(Change {
                kind: ChangeKind::RelationshipRemoved,
                entity: spec.forward.entity.clone(),
                field: None,
                relationship: Some(name.clone()),
                property: None,
                old_value: Some(Self::to_value(spec)),
                new_value: None,
                description: format!(
                    "Relationship {} removed ({} ↔ {} links lost)",
                    name, spec.forward.entity, spec.reverse.entity
                ),
                impact: Impact::Breaking,
            });
        }
    }

    /// Widening conversions are enhancements, everything else is breaking
    pub fn classify_type_change(from: FieldType, to: FieldType) -> Impact {
        if from == to {
            return Impact::NonBreaking;
        }
        if WIDENING_CONVERSIONS.contains(&(from, to)) {
            Impact::Enhancement
        } else {
            Impact::Breaking
        }
    }

    pub fn calculate_summary(changes: &[Change]) -> ChangeSummary {
        let mut summary = ChangeSummary {
            total_changes: changes.len(),
            ..Default::default()
        };

        for change in changes {
            match change.kind {
                ChangeKind::EntityAdded => summary.entities_added += 1,
                ChangeKind::EntityRemoved => summary.entities_removed += 1,
                ChangeKind::FieldAdded => summary.fields_added += 1,
                ChangeKind::FieldRemoved => summary.fields_removed += 1,
                ChangeKind::FieldModified => summary.fields_modified += 1,
                ChangeKind::RelationshipAdded => summary.relationships_added += 1,
                ChangeKind::RelationshipRemoved => summary.relationships_removed += 1,
            }
        }

        summary
    }

    /// Payload for `old_value` / `new_value`.
    ///
    /// Only called with `EntitySpec`, `FieldSpec` and `RelationshipSpec`:
    /// derived `Serialize`, string map keys, no floats, so `serde_json`
    /// has no error path for them.
    fn to_value<T: Serialize>(value: &T) -> Value {
        serde_json::to_value(value).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Cardinality, FieldDefinition, LinkSide, SchemaDescription};
    use crate::snapshot::SnapshotBuilder;
    use pretty_assertions::assert_eq;

    fn build(description: &SchemaDescription, version: &str) -> Snapshot {
        SnapshotBuilder::build(description, version).unwrap()
    }

    fn orders_with(field: FieldDefinition) -> SchemaDescription {
        SchemaDescription::new().with_entity(
            "orders",
            [
                ("status", FieldDefinition::typed("string")),
                ("total", field),
            ],
        )
    }

    #[test]
    fn test_diff_with_self_is_empty() {
        let snapshot = build(&orders_with(FieldDefinition::typed("number")), "v1");
        let result = Comparator::compare(&snapshot, &snapshot);

        assert!(result.is_empty());
        assert!(!result.migration_required);
        assert_eq!(result.summary_counts, ChangeSummary::default());
    }

    #[test]
    fn test_entity_added_and_removed() {
        let v1 = build(&orders_with(FieldDefinition::typed("number")), "v1");
        let v2 = build(
            &SchemaDescription::new().with_entity("customers", [("email", FieldDefinition::typed("string"))]),
            "v2",
        );

        let result = Comparator::compare(&v1, &v2);
        let kinds: Vec<_> = result.changes.iter().map(|c| (c.kind, c.entity.as_str(), c.impact)).collect();

        assert_eq!(
            kinds,
            vec![
                (ChangeKind::EntityAdded, "customers", Impact::Enhancement),
                (ChangeKind::EntityRemoved, "orders", Impact::Breaking),
            ]
        );
        assert_eq!(result.summary_counts.entities_added, 1);
        assert_eq!(result.summary_counts.entities_removed, 1);
        assert!(result.migration_required);
    }

    #[test]
    fn test_each_property_change_is_separate() {
        let v1 = build(&orders_with(FieldDefinition::typed("string").optional()), "v1");
        let v2 = build(&orders_with(FieldDefinition::typed("json").unique()), "v2");

        let result = Comparator::compare(&v1, &v2);
        let modified: Vec<_> = result
            .changes
            .iter()
            .map(|c| (c.kind, c.property, c.impact))
            .collect();

        assert_eq!(
            modified,
            vec![
                (ChangeKind::FieldModified, Some(FieldProperty::Type), Impact::Enhancement),
                (ChangeKind::FieldModified, Some(FieldProperty::Optional), Impact::Breaking),
                (ChangeKind::FieldModified, Some(FieldProperty::Indexed), Impact::Enhancement),
                (ChangeKind::FieldModified, Some(FieldProperty::Unique), Impact::Breaking),
            ]
        );
        assert_eq!(result.summary_counts.fields_modified, 4);
        assert_eq!(result.breaking_changes.len(), 2);
    }

    #[test]
    fn test_relaxing_constraints_is_non_breaking() {
        let v1 = build(&orders_with(FieldDefinition::typed("number").unique()), "v1");
        let v2 = build(&orders_with(FieldDefinition::typed("number").optional()), "v2");

        let result = Comparator::compare(&v1, &v2);
        let impacts: Vec<_> = result.changes.iter().map(|c| (c.property, c.impact)).collect();

        assert_eq!(
            impacts,
            vec![
                (Some(FieldProperty::Optional), Impact::NonBreaking),
                (Some(FieldProperty::Indexed), Impact::Enhancement),
                (Some(FieldProperty::Unique), Impact::NonBreaking),
            ]
        );
        assert!(!result.migration_required);
    }

    #[test]
    fn test_type_change_classification() {
        assert_eq!(Comparator::classify_type_change(FieldType::Dynamic, FieldType::Json), Impact::Enhancement);
        assert_eq!(Comparator::classify_type_change(FieldType::String, FieldType::Json), Impact::Enhancement);
        assert_eq!(Comparator::classify_type_change(FieldType::Json, FieldType::String), Impact::Breaking);
        assert_eq!(Comparator::classify_type_change(FieldType::Number, FieldType::String), Impact::Breaking);
        assert_eq!(Comparator::classify_type_change(FieldType::String, FieldType::Reference), Impact::Breaking);
    }

    #[test]
    fn test_relationship_changes() {
        let base = SchemaDescription::new()
            .with_entity("orders", [("total", FieldDefinition::typed("number"))])
            .with_entity("customers", [("email", FieldDefinition::typed("string"))]);
        let linked = base.clone().with_link(
            "orderCustomer",
            LinkSide::new("orders", Cardinality::One, "customer"),
            LinkSide::new("customers", Cardinality::Many, "orders"),
        );

        let v1 = build(&base, "v1");
        let v2 = build(&linked, "v2");

        let added = Comparator::compare(&v1, &v2);
        assert_eq!(added.changes.len(), 1);
        assert_eq!(added.changes[0].kind, ChangeKind::RelationshipAdded);
        assert_eq!(added.changes[0].relationship.as_deref(), Some("orderCustomer"));
        assert_eq!(added.changes[0].impact, Impact::Enhancement);

        let removed = Comparator::compare(&v2, &v1);
        assert_eq!(removed.changes.len(), 1);
        assert_eq!(removed.changes[0].kind, ChangeKind::RelationshipRemoved);
        assert_eq!(removed.changes[0].impact, Impact::Breaking);
        assert!(removed.migration_required);
    }

    #[test]
    fn test_breaking_changes_keep_order() {
        let v1 = build(
            &SchemaDescription::new()
                .with_entity("a", [("x", FieldDefinition::typed("string"))])
                .with_entity("b", [("y", FieldDefinition::typed("string"))]),
            "v1",
        );
        let v2 = build(
            &SchemaDescription::new()
                .with_entity("b", [("z", FieldDefinition::typed("string"))])
                .with_entity("c", std::iter::empty::<(&str, FieldDefinition)>()),
            "v2",
        );

        let result = Comparator::compare(&v1, &v2);
        let breaking: Vec<_> = result.breaking_changes.iter().map(Change::target).collect();

        assert_eq!(breaking, vec!["a".to_string(), "b.y".to_string()]);
        assert_eq!(result.summary_counts.total_changes, 4);
    }

    #[test]
    fn test_breaking_only_filters_changes() {
        let v1 = build(&orders_with(FieldDefinition::typed("number")), "v1");
        let v2 = build(
            &SchemaDescription::new().with_entity(
                "orders",
                [
                    ("total", FieldDefinition::typed("number")),
                    ("note", FieldDefinition::typed("string")),
                ],
            ),
            "v2",
        );

        let filtered = Comparator::compare(&v1, &v2).breaking_only();
        assert_eq!(filtered.changes.len(), 1);
        assert_eq!(filtered.changes[0].field.as_deref(), Some("status"));
        assert_eq!(filtered.summary_counts.fields_removed, 1);
        assert_eq!(filtered.summary_counts.fields_added, 0);
    }

    fn linked(forward: LinkSide, reverse: LinkSide) -> SchemaDescription {
        SchemaDescription::new()
            .with_entity("orders", [("total", FieldDefinition::typed("number"))])
            .with_entity("customers", [("email", FieldDefinition::typed("string"))])
            .with_link("orderCustomer", forward, reverse)
    }

    #[test]
    fn test_changed_relationship_is_remove_plus_add() {
        let v1 = build(
            &linked(
                LinkSide::new("orders", Cardinality::One, "customer"),
                LinkSide::new("customers", Cardinality::Many, "orders"),
            ),
            "v1",
        );
        let v2 = build(
            &linked(
                LinkSide::new("orders", Cardinality::One, "customer"),
                LinkSide::new("customers", Cardinality::One, "order"),
            ),
            "v2",
        );

        let result = Comparator::compare(&v1, &v2);
        let changes: Vec<_> = result
            .changes
            .iter()
            .map(|c| (c.kind, c.relationship.as_deref(), c.impact))
            .collect();

        assert_eq!(
            changes,
            vec![
                (ChangeKind::RelationshipAdded, Some("orderCustomer"), Impact::Enhancement),
                (ChangeKind::RelationshipRemoved, Some("orderCustomer"), Impact::Breaking),
            ]
        );
        assert_eq!(result.summary_counts.relationships_added, 1);
        assert_eq!(result.summary_counts.relationships_removed, 1);
        assert!(result.migration_required);
    }

    #[test]
    fn test_delimiter_names_still_diff() {
        let with_entities = |link: SchemaDescription| {
            link.with_entity("a", std::iter::empty::<(&str, FieldDefinition)>())
                .with_entity("b", std::iter::empty::<(&str, FieldDefinition)>())
                .with_entity("c", std::iter::empty::<(&str, FieldDefinition)>())
        };
        let v1 = build(
            &with_entities(SchemaDescription::new().with_link(
                "r",
                LinkSide::new("a", Cardinality::One, "x<->b:many:y"),
                LinkSide::new("c", Cardinality::One, "z"),
            )),
            "v1",
        );
        let v2 = build(
            &with_entities(SchemaDescription::new().with_link(
                "r",
                LinkSide::new("a", Cardinality::One, "x"),
                LinkSide::new("b", Cardinality::Many, "y<->c:one:z"),
            )),
            "v2",
        );

        assert_ne!(v1.checksum(), v2.checksum());

        let result = Comparator::compare(&v1, &v2);
        assert_eq!(result.changes.len(), 2);
        assert!(result.migration_required);
    }

    #[test]
    fn test_payloads_carry_specs() {
        let v1 = build(&orders_with(FieldDefinition::typed("number")), "v1");
        let v2 = build(
            &linked(
                LinkSide::new("orders", Cardinality::One, "customer"),
                LinkSide::new("customers", Cardinality::Many, "orders"),
            ),
            "v2",
        );

        let result = Comparator::compare(&v1, &v2);
        assert!(!result.changes.is_empty());

        for change in &result.changes {
            let payload = change
                .new_value
                .as_ref()
                .or(change.old_value.as_ref())
                .unwrap();
            match change.kind {
                ChangeKind::EntityAdded | ChangeKind::EntityRemoved => {
                    let spec: EntitySpec = serde_json::from_value(payload.clone()).unwrap();
                    assert_eq!(spec.name, change.entity);
                }
                ChangeKind::FieldAdded | ChangeKind::FieldRemoved => {
                    let spec: FieldSpec = serde_json::from_value(payload.clone()).unwrap();
                    assert_eq!(Some(spec.name.as_str()), change.field.as_deref());
                }
                ChangeKind::RelationshipAdded | ChangeKind::RelationshipRemoved => {
                    let spec: RelationshipSpec = serde_json::from_value(payload.clone()).unwrap();
                    assert_eq!(Some(spec.name.as_str()), change.relationship.as_deref());
                }
                ChangeKind::FieldModified => assert!(!payload.is_null()),
            }
        }
    }
}
