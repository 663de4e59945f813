//! Schema Snapshot Module
//!
//! The heart of the engine - capturing and comparing data models.
//! This module provides:
//! - Snapshot building (checksummed point-in-time captures)
//! - Snapshot persistence (file and in-memory stores)
//! - Schema diff engine (comparing snapshots, impact classification)

pub mod builder;
pub mod diff;
pub mod store;

pub use builder::{Snapshot, SnapshotBuilder};
pub use diff::{Change, ChangeKind, ChangeSummary, Comparator, ComparisonResult, FieldProperty, Impact};
pub use store::{FileSnapshotStore, MemorySnapshotStore, SnapshotMetadata, SnapshotStore};
