//! Pattern Store
//!
//! Persistent cache for the last-good pattern set, read synchronously at
//! startup before any classification occurs.

use crate::error::StoreError;
use crate::set::AdPatternSet;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::debug;

/// Key-value cache seam for the last-good pattern set.
pub trait PatternStore: Send + Sync {
    /// Load the cached set. `Ok(None)` means no cache exists yet.
    fn load(&self) -> Result<Option<AdPatternSet>, StoreError>;

    /// Persist a set as the new last-good cache.
    fn save(&self, set: &AdPatternSet) -> Result<(), StoreError>;
}

/// File-backed store: one JSON document at a host-supplied path.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PatternStore for JsonFileStore {
    fn load(&self) -> Result<Option<AdPatternSet>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)?;
        let set = serde_json::from_str(&raw)?;
        debug!("Loaded cached pattern set from {:?}", self.path);
        Ok(Some(set))
    }

    fn save(&self, set: &AdPatternSet) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(set)?;
        fs::write(&self.path, json)?;
        debug!("Persisted pattern set v{} to {:?}", set.version, self.path);
        Ok(())
    }
}

/// In-memory store for tests and embedded hosts without a disk cache.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Option<AdPatternSet>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PatternStore for MemoryStore {
    fn load(&self) -> Result<Option<AdPatternSet>, StoreError> {
        Ok(self.inner.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn save(&self, set: &AdPatternSet) -> Result<(), StoreError> {
        *self.inner.lock().unwrap_or_else(|e| e.into_inner()) = Some(set.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::set::AdSignature;
    use chrono::Utc;

    fn sample_set() -> AdPatternSet {
        AdPatternSet {
            version: 7,
            patterns: vec![AdSignature::DaterangeClass("twitch-stitched-ad".into())],
            fetched_at: Some(Utc::now()),
        }
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("patterns.json"));

        assert!(store.load().unwrap().is_none());

        store.save(&sample_set()).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.version, 7);
        assert_eq!(loaded.patterns.len(), 1);
    }

    #[test]
    fn test_file_store_corrupt_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("patterns.json");
        fs::write(&path, "{not json").unwrap();

        let store = JsonFileStore::new(path);
        assert!(matches!(store.load(), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn test_file_store_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested/cache/patterns.json"));
        store.save(&sample_set()).unwrap();
        assert!(store.load().unwrap().is_some());
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        assert!(store.load().unwrap().is_none());
        store.save(&sample_set()).unwrap();
        assert_eq!(store.load().unwrap().unwrap().version, 7);
    }
}
