//! Schema Snapshot Store
//!
//! Persists snapshots by an opaque key so later runs can diff against them.
//! Loading a key that was never saved is `Ok(None)`, not an error, so
//! callers can tell a first run apart from a storage failure.

use crate::error::{validation_error, EngineError, EngineResult};
use crate::snapshot::builder::Snapshot;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, info, warn};

static KEY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-][A-Za-z0-9._-]{0,127}$").expect("valid key regex"));

/// Metadata about a snapshot (lightweight, used for listing)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetadata {
    pub key: String,
    pub id: uuid::Uuid,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub checksum: String,
    pub entity_count: usize,
    pub field_count: usize,
    pub relationship_count: usize,
}

impl SnapshotMetadata {
    pub fn new(key: &str, snapshot: &Snapshot) -> Self {
        Self {
            key: key.to_string(),
            id: snapshot.id(),
            version: snapshot.version().to_string(),
            timestamp: snapshot.timestamp(),
            checksum: snapshot.checksum().to_string(),
            entity_count: snapshot.entities().len(),
            field_count: snapshot.field_count(),
            relationship_count: snapshot.relationships().len(),
        }
    }
}

/// Storage backend for snapshots
pub trait SnapshotStore: Send + Sync {
    /// Store a snapshot under `key`, replacing any previous one atomically
    fn save(&self, key: &str, snapshot: &Snapshot) -> EngineResult<SnapshotMetadata>;

    /// Load the snapshot stored under `key`, `None` if there is none
    fn load(&self, key: &str) -> EngineResult<Option<Snapshot>>;

    /// List stored snapshots, newest first
    fn list(&self) -> EngineResult<Vec<SnapshotMetadata>>;
}

/// Check that a key is usable as a storage name
pub fn validate_key(key: &str) -> EngineResult<()> {
    if KEY_PATTERN.is_match(key) {
        Ok(())
    } else {
        Err(validation_error(format!(
            "invalid snapshot key '{}': use letters, digits, '.', '_' or '-' and do not start with '.'",
            key
        )))
    }
}

/// Build a dated key such as `release-20261016-093000`
pub fn dated_key(name: &str) -> String {
    format!("{}-{}", name, Utc::now().format("%Y%m%d-%H%M%S"))
}

fn newest_first(list: &mut [SnapshotMetadata]) {
    list.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.key.cmp(&b.key)));
}

// =============================================================================
// FILE STORE
// =============================================================================

/// Directory-backed store, one JSON document per key
pub struct FileSnapshotStore {
    root: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> EngineResult<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(format!("{}.json", key)))
    }

    fn read_snapshot(key: &str, path: &Path) -> EngineResult<Option<Snapshot>> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let snapshot: Snapshot = serde_json::from_str(&raw).map_err(|e| EngineError::CorruptSnapshot {
            key: key.to_string(),
            reason: e.to_string(),
        })?;

        if !snapshot.verify_checksum() {
            return Err(EngineError::CorruptSnapshot {
                key: key.to_string(),
                reason: "checksum does not match content".to_string(),
            });
        }

        Ok(Some(snapshot))
    }
}

/// Best effort: make a rename inside `dir` durable
#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Ok(handle) = File::open(dir) {
        let _ = handle.sync_all();
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}

impl SnapshotStore for FileSnapshotStore {
    fn save(&self, key: &str, snapshot: &Snapshot) -> EngineResult<SnapshotMetadata> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.root)?;

        // Write to a unique temp file in the same directory, then rename over
        // the target so a reader sees either the old or the new document.
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0_u128, |d| d.as_nanos());
        let tmp_path = self
            .root
            .join(format!(".{}.tmp.{}.{}", key, std::process::id(), nanos));

        let bytes = serde_json::to_vec_pretty(snapshot)?;
        let written = (|| -> std::io::Result<()> {
            let mut temp = OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&tmp_path)?;
            temp.write_all(&bytes)?;
            temp.sync_all()?;
            fs::rename(&tmp_path, &path)
        })();

        if let Err(e) = written {
            if let Err(cleanup) = fs::remove_file(&tmp_path) {
                debug!("Could not remove temp file {}: {}", tmp_path.display(), cleanup);
            }
            return Err(e.into());
        }

        sync_dir(&self.root);

        let metadata = SnapshotMetadata::new(key, snapshot);
        info!(
            "Saved snapshot '{}' (version {}): {} entities, {} relationships",
            key, metadata.version, metadata.entity_count, metadata.relationship_count
        );
        Ok(metadata)
    }

    fn load(&self, key: &str) -> EngineResult<Option<Snapshot>> {
        let path = self.path_for(key)?;
        let snapshot = Self::read_snapshot(key, &path)?;
        if snapshot.is_none() {
            debug!("Snapshot '{}' not found in {}", key, self.root.display());
        }
        Ok(snapshot)
    }

    fn list(&self) -> EngineResult<Vec<SnapshotMetadata>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut list = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let Some(key) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_suffix(".json"))
            else {
                continue;
            };
            if validate_key(key).is_err() {
                continue;
            }

            match Self::read_snapshot(key, &path) {
                Ok(Some(snapshot)) => list.push(SnapshotMetadata::new(key, &snapshot)),
                Ok(None) => {}
                Err(e) => warn!("Skipping unreadable snapshot '{}': {}", key, e),
            }
        }

        newest_first(&mut list);
        Ok(list)
    }
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// In-process store, used by tests and by the server when no directory is set
#[derive(Default)]
pub struct MemorySnapshotStore {
    snapshots: RwLock<HashMap<String, Snapshot>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> EngineError {
    EngineError::Storage(std::io::Error::other("snapshot store lock poisoned"))
}

impl SnapshotStore for MemorySnapshotStore {
    fn save(&self, key: &str, snapshot: &Snapshot) -> EngineResult<SnapshotMetadata> {
        validate_key(key)?;
        let mut snapshots = self.snapshots.write().map_err(|_| poisoned())?;
        snapshots.insert(key.to_string(), snapshot.clone());
        debug!("Stored snapshot '{}' in memory", key);
        Ok(SnapshotMetadata::new(key, snapshot))
    }

    fn load(&self, key: &str) -> EngineResult<Option<Snapshot>> {
        validate_key(key)?;
        let snapshots = self.snapshots.read().map_err(|_| poisoned())?;
        Ok(snapshots.get(key).cloned())
    }

    fn list(&self) -> EngineResult<Vec<SnapshotMetadata>> {
        let snapshots = self.snapshots.read().map_err(|_| poisoned())?;
        let mut list: Vec<_> = snapshots
            .iter()
            .map(|(key, snapshot)| SnapshotMetadata::new(key, snapshot))
            .collect();
        newest_first(&mut list);
        Ok(list)
    }
}
