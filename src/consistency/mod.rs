//! Consistency Module
//!
//! Single-snapshot quality checks:
//! - Rule tables (naming, duplicate concepts, relationship roles, aliases)
//! - Analyzer producing per-entity and global severity breakdowns
//! - Single `field:type` validator reusing the analyzer's field checks

pub mod analyzer;
pub mod rules;
pub mod validator;

pub use analyzer::{
    to_camel_case, AnalysisReport, ConsistencyAnalyzer, EntityBreakdown, EntityReport, Inconsistency,
    InconsistencyKind, Severity, SeverityCounts,
};
pub use rules::{default_rules, Rule};
pub use validator::{FieldInput, FieldValidation, FieldValidator};
