//! Negative-keyword persistence.
//!
//! Readers take an `Arc` snapshot and never block on writers for longer than a pointer
//! swap. Writers are serialized by a dedicated lock held across the durable write, and the
//! in-memory snapshot is only replaced once the new set is on disk.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use tracing::{info, warn};

use crate::domain::error::{AppError, Result};
use crate::domain::keywords::KeywordSet;
use crate::infrastructure::storage::atomic_write_bytes;

pub trait KeywordStore: Send + Sync {
    /// Current canonical set.
    fn get(&self) -> Arc<KeywordSet>;

    /// Append new normalized entries; never removes anything.
    fn merge(&self, entries: &[String]) -> Result<Arc<KeywordSet>>;

    /// Replace the whole set with the normalized `entries`.
    fn replace_all(&self, entries: &[String]) -> Result<Arc<KeywordSet>>;
}

/// Snapshot cell shared by both store implementations.
struct SnapshotCell {
    current: RwLock<Arc<KeywordSet>>,
    writer: Mutex<()>,
}

impl SnapshotCell {
    fn new(initial: KeywordSet) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
            writer: Mutex::new(()),
        }
    }

    fn read(&self) -> Arc<KeywordSet> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    /// Compute the next set from the current one, persist it, then publish it.
    fn update(
        &self,
        compute: impl FnOnce(&KeywordSet) -> KeywordSet,
        persist: impl FnOnce(&KeywordSet) -> Result<()>,
    ) -> Result<Arc<KeywordSet>> {
        let _writer = self
            .writer
            .lock()
            .map_err(|_| AppError::Internal("keyword store writer lock poisoned".to_string()))?;

        let current = self.read();
        let next = compute(&current);
        if next == *current {
            return Ok(current);
        }

        persist(&next)?;

        let next = Arc::new(next);
        match self.current.write() {
            Ok(mut guard) => *guard = Arc::clone(&next),
            Err(poisoned) => *poisoned.into_inner() = Arc::clone(&next),
        }
        Ok(next)
    }
}

/// Keyword set stored as a JSON array of strings in a single file.
pub struct JsonFileKeywordStore {
    path: PathBuf,
    cell: SnapshotCell,
}

impl JsonFileKeywordStore {
    /// Load the set from `path`. A missing file yields `seed` (written once so it persists).
    pub fn open(path: impl Into<PathBuf>, seed: &[String]) -> Result<Self> {
        let path = path.into();

        let initial = if path.exists() {
            let set = load_keyword_file(&path)?;
            info!(path = %path.display(), count = set.len(), "Loaded negative keywords");
            set
        } else {
            let set = KeywordSet::normalized(seed);
            if !set.is_empty() {
                write_keyword_file(&path, &set)?;
            }
            info!(
                path = %path.display(),
                count = set.len(),
                "No keyword file found, starting from seed list"
            );
            set
        };

        Ok(Self {
            path,
            cell: SnapshotCell::new(initial),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeywordStore for JsonFileKeywordStore {
    fn get(&self) -> Arc<KeywordSet> {
        self.cell.read()
    }

    fn merge(&self, entries: &[String]) -> Result<Arc<KeywordSet>> {
        let updated = self
            .cell
            .update(|current| current.merged(entries), |next| {
                write_keyword_file(&self.path, next)
            })
            .map_err(|e| {
                warn!(path = %self.path.display(), error = %e, "Keyword merge not persisted");
                e
            })?;
        info!(count = updated.len(), "Negative keywords merged");
        Ok(updated)
    }

    fn replace_all(&self, entries: &[String]) -> Result<Arc<KeywordSet>> {
        let updated = self
            .cell
            .update(|_| KeywordSet::normalized(entries), |next| {
                write_keyword_file(&self.path, next)
            })
            .map_err(|e| {
                warn!(path = %self.path.display(), error = %e, "Keyword replace not persisted");
                e
            })?;
        info!(count = updated.len(), "Negative keywords replaced");
        Ok(updated)
    }
}

/// Process-local store. Used in tests and when no data directory is configured.
pub struct InMemoryKeywordStore {
    cell: SnapshotCell,
}

impl InMemoryKeywordStore {
    pub fn new(initial: KeywordSet) -> Self {
        Self {
            cell: SnapshotCell::new(initial),
        }
    }
}

impl Default for InMemoryKeywordStore {
    fn default() -> Self {
        Self::new(KeywordSet::new())
    }
}

impl KeywordStore for InMemoryKeywordStore {
    fn get(&self) -> Arc<KeywordSet> {
        self.cell.read()
    }

    fn merge(&self, entries: &[String]) -> Result<Arc<KeywordSet>> {
        self.cell.update(|current| current.merged(entries), |_| Ok(()))
    }

    fn replace_all(&self, entries: &[String]) -> Result<Arc<KeywordSet>> {
        self.cell
            .update(|_| KeywordSet::normalized(entries), |_| Ok(()))
    }
}

fn load_keyword_file(path: &Path) -> Result<KeywordSet> {
    let bytes = fs::read(path).map_err(|e| {
        AppError::PersistenceError(format!(
            "Failed to read keyword file {}: {e}",
            path.display()
        ))
    })?;
    // Deserializing through KeywordSet normalizes hand-edited files.
    serde_json::from_slice::<KeywordSet>(&bytes).map_err(|e| {
        AppError::PersistenceError(format!(
            "Keyword file {} is not a JSON list of strings: {e}",
            path.display()
        ))
    })
}

fn write_keyword_file(path: &Path, set: &KeywordSet) -> Result<()> {
    let json = serde_json::to_vec_pretty(set).map_err(|e| {
        AppError::PersistenceError(format!("Failed to serialize keywords: {e}"))
    })?;
    atomic_write_bytes(path, &json)
}
