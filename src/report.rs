//! Report Presenter
//!
//! Human-readable renderings of engine results for the terminal, and the
//! JSON form of the same data. Rendering never changes what a result says;
//! filtering (critical-only, breaking-only) happens on the result itself.

use crate::consistency::{AnalysisReport, EntityReport, FieldValidation, Inconsistency, Rule, Severity};
use crate::error::EngineResult;
use crate::migration::{MigrationPlan, Priority};
use crate::snapshot::{Change, ComparisonResult, Impact, Snapshot, SnapshotMetadata};
use colored::*;
use serde::Serialize;
use std::fmt::Write;

/// Output format for presented results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Text,
    Json,
}

/// A result that can be shown to a human
pub trait Presentable: Serialize {
    fn render_text(&self) -> String;
}

/// Render a result in the requested format
pub fn render<T: Presentable + ?Sized>(value: &T, format: Format) -> EngineResult<String> {
    match format {
        Format::Text => Ok(value.render_text()),
        Format::Json => Ok(serde_json::to_string_pretty(value)?),
    }
}

fn severity_label(severity: Severity) -> ColoredString {
    match severity {
        Severity::High => "HIGH".red().bold(),
        Severity::Medium => "MEDIUM".yellow(),
        Severity::Low => "LOW".blue(),
    }
}

fn impact_label(impact: Impact) -> ColoredString {
    match impact {
        Impact::Breaking => impact.as_str().red().bold(),
        Impact::NonBreaking => impact.as_str().yellow(),
        Impact::Enhancement => impact.as_str().green(),
    }
}

fn priority_label(priority: Priority) -> ColoredString {
    let label = priority.to_string().to_uppercase();
    match priority {
        Priority::Critical => label.red().bold(),
        Priority::High => label.red(),
        Priority::Medium => label.yellow(),
        Priority::Low => label.green(),
    }
}

fn write_finding(out: &mut String, finding: &Inconsistency) {
    let location = match &finding.field {
        Some(field) => format!("{}.{}", finding.entity, field),
        None => finding.entity.clone(),
    };
    let _ = writeln!(
        out,
        "  [{}] {} {}",
        severity_label(finding.severity),
        location.cyan(),
        finding.kind.to_string().dimmed()
    );
    let _ = writeln!(out, "      {}", finding.description);
    let _ = writeln!(out, "      {} {}", "fix:".green(), finding.suggested_fix);
}

impl Presentable for AnalysisReport {
    fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} {} ({})",
            "Consistency report for".bold(),
            self.snapshot_version.cyan(),
            short_checksum(&self.checksum).dimmed()
        );
        let _ = writeln!(out);

        if self.inconsistencies.is_empty() {
            let _ = writeln!(out, "{} No issues found", "✓".green());
        } else {
            for finding in &self.inconsistencies {
                write_finding(&mut out, finding);
            }
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "{}", "Per entity:".bold());
        for (name, breakdown) in &self.per_entity_breakdown {
            let _ = writeln!(
                out,
                "  {:<24} {:>3} fields  {:>3} issues ({} high, {} medium, {} low)",
                name,
                breakdown.field_count,
                breakdown.issues.total,
                breakdown.issues.high,
                breakdown.issues.medium,
                breakdown.issues.low
            );
        }

        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{} {} issues: {} high, {} medium, {} low",
            if self.is_healthy() { "✓".green() } else { "✗".red() },
            self.summary.total,
            self.summary.high.to_string().red(),
            self.summary.medium.to_string().yellow(),
            self.summary.low
        );
        out
    }
}

impl Presentable for EntityReport {
    fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} {} ({} fields)",
            "Entity".bold(),
            self.entity.name.cyan().bold(),
            self.entity.field_count()
        );

        for field in self.entity.fields.values() {
            let mut flags = Vec::new();
            if field.optional {
                flags.push("optional");
            }
            if field.unique {
                flags.push("unique");
            } else if field.indexed {
                flags.push("indexed");
            }
            let _ = writeln!(
                out,
                "  {:<24} {:<10} {}",
                field.name,
                field.field_type.to_string(),
                flags.join(", ").dimmed()
            );
        }

        if !self.relationships.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "{}", "Relationships:".bold());
            for rel in &self.relationships {
                let _ = writeln!(out, "  {}: {} → {}", rel.name.cyan(), rel.forward, rel.reverse);
            }
        }

        let _ = writeln!(out);
        if self.inconsistencies.is_empty() {
            let _ = writeln!(out, "{} No issues found", "✓".green());
        } else {
            let _ = writeln!(out, "{} ({})", "Issues:".bold(), self.inconsistencies.len());
            for finding in &self.inconsistencies {
                write_finding(&mut out, finding);
            }
        }
        out
    }
}

impl Presentable for FieldValidation {
    fn render_text(&self) -> String {
        let mut out = String::new();
        if self.valid {
            let _ = writeln!(out, "{} {} is valid", "✓".green(), self.input.cyan());
            return out;
        }

        let _ = writeln!(out, "{} {} has {} issue(s)", "✗".red(), self.input.cyan(), self.issues.len());
        for issue in &self.issues {
            let _ = writeln!(out, "  - {}", issue);
        }
        out
    }
}

fn write_change(out: &mut String, change: &Change) {
    let _ = writeln!(
        out,
        "  {:<22} {:<32} {}",
        change.kind.to_string(),
        change.target(),
        impact_label(change.impact)
    );
    let _ = writeln!(out, "      {}", change.description.dimmed());
}

impl Presentable for ComparisonResult {
    fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} {} → {}",
            "Comparing".bold(),
            self.from_version.cyan(),
            self.to_version.cyan()
        );
        let _ = writeln!(out);

        if self.changes.is_empty() {
            let _ = writeln!(out, "{} No changes", "✓".green());
            return out;
        }

        for change in &self.changes {
            write_change(&mut out, change);
        }

        let s = &self.summary_counts;
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{} changes: entities +{} -{}, fields +{} -{} ~{}, relationships +{} -{}",
            s.total_changes,
            s.entities_added,
            s.entities_removed,
            s.fields_added,
            s.fields_removed,
            s.fields_modified,
            s.relationships_added,
            s.relationships_removed
        );
        if self.migration_required {
            let _ = writeln!(
                out,
                "{} {} breaking change(s), migration required",
                "⚠".red(),
                self.breaking_changes.len()
            );
        } else {
            let _ = writeln!(out, "{} No breaking changes", "✓".green());
        }
        out
    }
}

impl Presentable for MigrationPlan {
    fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} {} → {}",
            "Migration plan".bold(),
            self.from_version.cyan(),
            self.to_version.cyan()
        );
        let _ = writeln!(out);

        if self.steps.is_empty() {
            let _ = writeln!(out, "{} Nothing to migrate", "✓".green());
            return out;
        }

        for step in &self.steps {
            let _ = writeln!(
                out,
                "  {:<8} [{}]{} {}",
                step.id,
                priority_label(step.priority),
                if step.requires_downtime { " (downtime)".red().to_string() } else { String::new() },
                step.forward_operation
            );
            let _ = writeln!(out, "      {} {}", "undo:".dimmed(), step.inverse_operation);
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "{}", "Rollback:".bold());
        for (i, op) in self.rollback_plan.iter().enumerate() {
            let _ = writeln!(out, "  {}. {}", i + 1, op);
        }

        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{} steps, estimated {} minutes, {}",
            self.steps.len(),
            self.estimated_duration_minutes,
            if self.requires_downtime {
                "downtime required".red().bold()
            } else {
                "no downtime".green()
            }
        );
        out
    }
}

impl Presentable for Snapshot {
    fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} {} ({})",
            "Snapshot".bold(),
            self.version().cyan(),
            self.timestamp().to_rfc3339().dimmed()
        );
        let _ = writeln!(out, "  checksum: {}", self.checksum());
        for entity in self.entities().values() {
            let _ = writeln!(out, "  {} ({} fields)", entity.name.cyan(), entity.field_count());
            for field in entity.fields.values() {
                let _ = writeln!(out, "    {}: {}", field.name, field.field_type);
            }
        }
        for rel in self.relationships().values() {
            let _ = writeln!(out, "  {}: {} → {}", rel.name.cyan(), rel.forward, rel.reverse);
        }
        out
    }
}

impl Presentable for [SnapshotMetadata] {
    fn render_text(&self) -> String {
        let mut out = String::new();
        if self.is_empty() {
            let _ = writeln!(out, "{}", "(no snapshots)".dimmed());
            return out;
        }

        for meta in self {
            let _ = writeln!(
                out,
                "  {:<32} {:<16} {}  {} entities, {} fields, {} relationships  {}",
                meta.key.cyan(),
                meta.version,
                meta.timestamp.format("%Y-%m-%d %H:%M:%S"),
                meta.entity_count,
                meta.field_count,
                meta.relationship_count,
                short_checksum(&meta.checksum).dimmed()
            );
        }
        out
    }
}

impl Presentable for [Rule] {
    fn render_text(&self) -> String {
        let mut out = String::new();
        for rule in self {
            let _ = writeln!(
                out,
                "  {} [{}] {} ({})",
                rule.id.cyan(),
                severity_label(rule.severity),
                rule.name.bold(),
                rule.kind
            );
            let _ = writeln!(out, "      {}", rule.description);
        }
        out
    }
}

fn short_checksum(checksum: &str) -> &str {
    checksum.get(..12).unwrap_or(checksum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consistency::ConsistencyAnalyzer;
    use crate::migration::MigrationPlanner;
    use crate::models::{FieldDefinition, SchemaDescription};
    use crate::snapshot::{Comparator, SnapshotBuilder};

    fn snapshots() -> (Snapshot, Snapshot) {
        let v1 = SnapshotBuilder::build(
            &SchemaDescription::new().with_entity(
                "orders",
                [
                    ("total", FieldDefinition::typed("number")),
                    ("createdat", FieldDefinition::typed("date")),
                ],
            ),
            "v1",
        )
        .unwrap();
        let v2 = SnapshotBuilder::build(
            &SchemaDescription::new().with_entity("orders", [("createdat", FieldDefinition::typed("date"))]),
            "v2",
        )
        .unwrap();
        (v1, v2)
    }

    #[test]
    fn test_analysis_text_mentions_findings() {
        colored::control::set_override(false);
        let (v1, _) = snapshots();
        let text = ConsistencyAnalyzer::analyze(&v1).render_text();
        assert!(text.contains("orders.createdat"));
        assert!(text.contains("createdAt"));
        assert!(text.contains("1 issues"));
    }

    #[test]
    fn test_comparison_and_plan_text() {
        colored::control::set_override(false);
        let (v1, v2) = snapshots();
        let result = Comparator::compare(&v1, &v2);
        let text = result.render_text();
        assert!(text.contains("field_removed"));
        assert!(text.contains("orders.total"));
        assert!(text.contains("migration required"));

        let plan = MigrationPlanner::plan(&result).unwrap();
        let text = plan.render_text();
        assert!(text.contains("step-1"));
        assert!(text.contains("Drop field orders.total"));
        assert!(text.contains("downtime required"));
    }

    #[test]
    fn test_json_format() {
        let (v1, v2) = snapshots();
        let result = Comparator::compare(&v1, &v2);
        let json = render(&result, Format::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["migrationRequired"], true);
        assert_eq!(value["changes"][0]["kind"], "field_removed");
    }

    #[test]
    fn test_empty_list() {
        colored::control::set_override(false);
        let list: Vec<SnapshotMetadata> = Vec::new();
        assert!(list.render_text().contains("no snapshots"));
    }

    #[test]
    fn test_short_checksum() {
        assert_eq!(short_checksum("abc"), "abc");
        assert_eq!(short_checksum("0123456789abcdef"), "0123456789ab");
    }
}
