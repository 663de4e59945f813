//! Application state management
//!
//! Contains shared state accessible across all handlers. The engine itself
//! is stateless; the only shared resource is the snapshot store.

use crate::snapshot::{FileSnapshotStore, MemorySnapshotStore, SnapshotStore};
use std::path::PathBuf;
use std::sync::Arc;

/// Application state shared across all handlers
pub struct AppState {
    /// Snapshot persistence (file-backed in production)
    pub store: Arc<dyn SnapshotStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        Self { store }
    }

    /// State backed by a snapshot directory on disk
    pub fn with_snapshot_dir(dir: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FileSnapshotStore::new(dir)))
    }

    /// State backed by memory only
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySnapshotStore::new()))
    }
}

/// Type alias for shared state
pub type SharedState = Arc<AppState>;
