//! Consistency Analyzer
//!
//! Inspects a single Snapshot for naming, typing, duplication and
//! relationship-modeling problems. Findings are data: analysis never fails,
//! however bad the schema is.

use crate::error::{not_found_error, EngineResult};
use crate::models::{EntitySpec, FieldSpec, FieldType, RelationshipSpec};
use crate::snapshot::Snapshot;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

use super::rules;

/// camelCase: lowercase first letter, letters and digits only
pub static FIELD_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-zA-Z0-9]*$").expect("valid field name regex"));

/// Finding severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => f.write_str("low"),
            Severity::Medium => f.write_str("medium"),
            Severity::High => f.write_str("high"),
        }
    }
}

/// Category of a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InconsistencyKind {
    FieldNaming,
    DuplicateField,
    TypeMisuse,
    MissingRelationship,
    DuplicateEntity,
}

impl fmt::Display for InconsistencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InconsistencyKind::FieldNaming => "field_naming",
            InconsistencyKind::DuplicateField => "duplicate_field",
            InconsistencyKind::TypeMisuse => "type_misuse",
            InconsistencyKind::MissingRelationship => "missing_relationship",
            InconsistencyKind::DuplicateEntity => "duplicate_entity",
        };
        f.write_str(name)
    }
}

/// A single-snapshot quality finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inconsistency {
    pub kind: InconsistencyKind,
    pub entity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub description: String,
    pub suggested_fix: String,
    pub severity: Severity,
}

/// Severity tally
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeverityCounts {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub total: usize,
}

impl SeverityCounts {
    pub fn record(&mut self, severity: Severity) {
        match severity {
            Severity::Low => self.low += 1,
            Severity::Medium => self.medium += 1,
            Severity::High => self.high += 1,
        }
        self.total += 1;
    }

    pub fn from_findings<'a>(findings: impl IntoIterator<Item = &'a Inconsistency>) -> Self {
        let mut counts = Self::default();
        for finding in findings {
            counts.record(finding.severity);
        }
        counts
    }
}

/// Per-entity view of the findings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityBreakdown {
    pub field_count: usize,
    pub issues: SeverityCounts,
}

/// Result of analyzing a whole snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub snapshot_version: String,
    pub checksum: String,
    pub inconsistencies: Vec<Inconsistency>,
    pub per_entity_breakdown: BTreeMap<String, EntityBreakdown>,
    pub summary: SeverityCounts,
}

impl AnalysisReport {
    /// No high severity findings
    pub fn is_healthy(&self) -> bool {
        self.summary.high == 0
    }

    /// Copy of this report keeping only high severity findings
    pub fn critical_only(&self) -> Self {
        let inconsistencies: Vec<_> = self
            .inconsistencies
            .iter()
            .filter(|i| i.severity == Severity::High)
            .cloned()
            .collect();

        let per_entity_breakdown = self
            .per_entity_breakdown
            .iter()
            .map(|(name, breakdown)| {
                let issues = SeverityCounts::from_findings(
                    inconsistencies.iter().filter(|i| &i.entity == name),
                );
                (
                    name.clone(),
                    EntityBreakdown {
                        field_count: breakdown.field_count,
                        issues,
                    },
                )
            })
            .collect();

        Self {
            snapshot_version: self.snapshot_version.clone(),
            checksum: self.checksum.clone(),
            summary: SeverityCounts::from_findings(&inconsistencies),
            inconsistencies,
            per_entity_breakdown,
        }
    }
}

/// Result of analyzing one entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityReport {
    pub entity: EntitySpec,
    pub relationships: Vec<RelationshipSpec>,
    pub inconsistencies: Vec<Inconsistency>,
    pub breakdown: EntityBreakdown,
}

impl EntityReport {
    /// Copy of this report keeping only high severity findings
    pub fn critical_only(&self) -> Self {
        let inconsistencies: Vec<_> = self
            .inconsistencies
            .iter()
            .filter(|i| i.severity == Severity::High)
            .cloned()
            .collect();

        Self {
            entity: self.entity.clone(),
            relationships: self.relationships.clone(),
            breakdown: EntityBreakdown {
                field_count: self.breakdown.field_count,
                issues: SeverityCounts::from_findings(&inconsistencies),
            },
            inconsistencies,
        }
    }
}

/// Stateless analyzer; every call works only on the snapshot it is given
pub struct ConsistencyAnalyzer;

impl ConsistencyAnalyzer {
    /// Run every check over the snapshot
    pub fn analyze(snapshot: &Snapshot) -> AnalysisReport {
        let mut inconsistencies = Vec::new();

        for entity in snapshot.entities().values() {
            Self::check_entity(entity, &mut inconsistencies);
        }
        Self::check_duplicate_entities(snapshot, &mut inconsistencies);

        let per_entity_breakdown = snapshot
            .entities()
            .values()
            .map(|entity| {
                let issues = SeverityCounts::from_findings(
                    inconsistencies.iter().filter(|i| i.entity == entity.name),
                );
                (
                    entity.name.clone(),
                    EntityBreakdown {
                        field_count: entity.field_count(),
                        issues,
                    },
                )
            })
            .collect();

        let summary = SeverityCounts::from_findings(&inconsistencies);

        debug!(
            "Analyzed snapshot '{}': {} findings ({} high, {} medium, {} low)",
            snapshot.version(),
            summary.total,
            summary.high,
            summary.medium,
            summary.low
        );

        AnalysisReport {
            snapshot_version: snapshot.version().to_string(),
            checksum: snapshot.checksum().to_string(),
            inconsistencies,
            per_entity_breakdown,
            summary,
        }
    }

    /// Analyze a single named entity
    pub fn analyze_entity(snapshot: &Snapshot, name: &str) -> EngineResult<EntityReport> {
        let entity = snapshot
            .entity(name)
            .ok_or_else(|| not_found_error(format!("Entity '{}' not found in snapshot '{}'", name, snapshot.version())))?;

        let mut report = Self::analyze(snapshot);
        let inconsistencies: Vec<_> = report
            .inconsistencies
            .drain(..)
            .filter(|i| i.entity == name)
            .collect();
        let breakdown = report.per_entity_breakdown.remove(name).unwrap_or_default();

        let relationships = snapshot
            .relationships()
            .values()
            .filter(|r| r.touches(name))
            .cloned()
            .collect();

        Ok(EntityReport {
            entity: entity.clone(),
            relationships,
            inconsistencies,
            breakdown,
        })
    }

    fn check_entity(entity: &EntitySpec, findings: &mut Vec<Inconsistency>) {
        for field in entity.fields.values() {
            if let Some(finding) = Self::check_naming(&entity.name, field) {
                findings.push(finding);
            }
        }

        Self::check_duplicate_fields(entity, findings);

        for field in entity.fields.values() {
            if let Some(finding) = Self::check_type(&entity.name, field) {
                findings.push(finding);
            }
        }

        for field in entity.fields.values() {
            if let Some(finding) = Self::check_relationship_modeling(&entity.name, field) {
                findings.push(finding);
            }
        }
    }

    /// Field-local checks (naming and typing), shared with the field validator
    pub fn check_field(entity: &str, field: &FieldSpec) -> Vec<Inconsistency> {
        [
            Self::check_naming(entity, field),
            Self::check_type(entity, field),
            Self::check_relationship_modeling(entity, field),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    fn check_naming(entity: &str, field: &FieldSpec) -> Option<Inconsistency> {
        let name = &field.name;

        if !FIELD_NAME_PATTERN.is_match(name) {
            let suggestion = to_camel_case(name);
            return Some(Inconsistency {
                kind: InconsistencyKind::FieldNaming,
                entity: entity.to_string(),
                field: Some(name.clone()),
                description: format!(
                    "Field '{}' does not follow camelCase (lowercase start, letters and digits only)",
                    name
                ),
                suggested_fix: format!("Rename '{}' to '{}'", name, suggestion),
                severity: Severity::Low,
            });
        }

        let suggestion = timestamp_suffix_fix(name)?;
        Some(Inconsistency {
            kind: InconsistencyKind::FieldNaming,
            entity: entity.to_string(),
            field: Some(name.clone()),
            description: format!(
                "Field '{}' looks like a timestamp but does not use the 'xxxAt' convention",
                name
            ),
            suggested_fix: format!("Rename '{}' to '{}'", name, suggestion),
            severity: Severity::Medium,
        })
    }

    fn check_duplicate_fields(entity: &EntitySpec, findings: &mut Vec<Inconsistency>) {
        for (deprecated, canonical) in rules::DEPRECATED_FIELDS {
            if entity.has_field(deprecated) && entity.has_field(canonical) {
                findings.push(Inconsistency {
                    kind: InconsistencyKind::DuplicateField,
                    entity: entity.name.clone(),
                    field: Some(deprecated.to_string()),
                    description: format!(
                        "Fields '{}' and '{}' store the same value on {}",
                        deprecated, canonical, entity.name
                    ),
                    suggested_fix: format!(
                        "Migrate data into '{}' and remove the deprecated '{}'",
                        canonical, deprecated
                    ),
                    severity: Severity::High,
                });
            }
        }
    }

    fn check_type(entity: &str, field: &FieldSpec) -> Option<Inconsistency> {
        let name = &field.name;
        let finding = |description: String, suggested_fix: String, severity: Severity| Inconsistency {
            kind: InconsistencyKind::TypeMisuse,
            entity: entity.to_string(),
            field: Some(name.clone()),
            description,
            suggested_fix,
            severity,
        };

        if field.field_type == FieldType::Dynamic {
            return Some(finding(
                format!("Field '{}' is typed 'any'; its shape is unchecked", name),
                "Use a structured type (json for nested data, or a specific scalar type)".to_string(),
                Severity::Medium,
            ));
        }

        if rules::implies_timestamp(name) && field.field_type != FieldType::Date {
            return Some(finding(
                format!(
                    "Field '{}' holds a timestamp but is typed {}",
                    name, field.field_type
                ),
                format!("Change '{}' to type date", name),
                Severity::Medium,
            ));
        }

        if rules::implies_money(name) && field.field_type != FieldType::Number {
            return Some(finding(
                format!(
                    "Field '{}' holds a monetary value but is typed {}",
                    name, field.field_type
                ),
                format!("Change '{}' to type number", name),
                Severity::High,
            ));
        }

        None
    }

    fn check_relationship_modeling(entity: &str, field: &FieldSpec) -> Option<Inconsistency> {
        if field.field_type != FieldType::String {
            return None;
        }

        let role = rules::relationship_roles(entity)
            .iter()
            .find(|role| **role == field.name)?;

        Some(Inconsistency {
            kind: InconsistencyKind::MissingRelationship,
            entity: entity.to_string(),
            field: Some(field.name.clone()),
            description: format!(
                "{}.{} refers to a {} by free text instead of a relationship",
                entity, field.name, role
            ),
            suggested_fix: format!("Replace '{}' with a reference field '{}Id'", role, role),
            severity: Severity::High,
        })
    }

    fn check_duplicate_entities(snapshot: &Snapshot, findings: &mut Vec<Inconsistency>) {
        for (canonical, alias) in rules::ENTITY_ALIASES {
            if snapshot.entity(canonical).is_some() && snapshot.entity(alias).is_some() {
                findings.push(Inconsistency {
                    kind: InconsistencyKind::DuplicateEntity,
                    entity: alias.to_string(),
                    field: None,
                    description: format!(
                        "Entities '{}' and '{}' model the same concept",
                        canonical, alias
                    ),
                    suggested_fix: format!("Merge '{}' into '{}'", alias, canonical),
                    severity: Severity::High,
                });
            }
        }
    }
}

/// Rewrite an arbitrary identifier as camelCase
pub fn to_camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());

    for (i, segment) in name
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|s| !s.is_empty())
        .enumerate()
    {
        let segment = if segment.chars().all(|c| !c.is_ascii_lowercase()) {
            segment.to_ascii_lowercase()
        } else {
            segment.to_string()
        };

        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            if i == 0 {
                out.push(first.to_ascii_lowercase());
            } else {
                out.push(first.to_ascii_uppercase());
            }
            out.extend(chars);
        }
    }

    match out.chars().next() {
        None => "field".to_string(),
        Some(c) if c.is_ascii_digit() => format!("field{}", out),
        Some(_) => out,
    }
}

/// `createdat` -> `createdAt`; `None` when the name is fine
fn timestamp_suffix_fix(name: &str) -> Option<String> {
    let stem = name.strip_suffix("at")?;
    let before = stem.chars().last()?;
    if before.is_ascii_uppercase() {
        return None;
    }

    // Only the last camelCase word decides whether "at" is part of a real word
    let last_word_start = stem.rfind(|c: char| c.is_ascii_uppercase()).unwrap_or(0);
    let last_word = name[last_word_start..].to_ascii_lowercase();
    if rules::AT_SUFFIX_EXEMPT.contains(&last_word.as_str()) {
        return None;
    }

    Some(format!("{}At", stem))
}
