//! SchemaFlow Evolve - schema evolution and migration planning
//!
//! Given a declarative description of a data model (entities, typed fields
//! and relationships) the engine:
//! - detects inconsistencies within a single version (`consistency`)
//! - diffs two versions and classifies every change by impact (`snapshot::diff`)
//! - plans an ordered, reversible migration between them (`migration`)
//!
//! Everything operates on immutable, checksummed [`Snapshot`]s built from a
//! [`SchemaDescription`]. The engine never touches live data.

pub mod config;
pub mod consistency;
pub mod error;
pub mod migration;
pub mod models;
pub mod report;
pub mod routes;
pub mod snapshot;
pub mod state;

pub use consistency::{AnalysisReport, ConsistencyAnalyzer, FieldValidator, Inconsistency, Severity};
pub use error::{EngineError, EngineResult};
pub use migration::{MigrationPlan, MigrationPlanner, Operation, Priority, Step};
pub use models::{FieldType, SchemaDescription};
pub use snapshot::{Change, ChangeKind, Comparator, ComparisonResult, Impact, Snapshot, SnapshotBuilder};
