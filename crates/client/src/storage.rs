//! Snapshot persistence for store state.
//!
//! Each store is saved as one JSON document under its own key. The file
//! backend writes `{dir}/{key}.json` through a temp file and a rename, so a
//! crash mid-write leaves the previous snapshot intact.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while reading or writing snapshots.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Snapshot JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid snapshot key: {0}")]
    InvalidKey(String),
}

/// A key/value store for JSON snapshots.
#[async_trait]
pub trait SnapshotStorage: Send + Sync {
    /// Load the snapshot stored under `key`, if there is one.
    async fn load(&self, key: &str) -> Result<Option<Value>, StorageError>;

    /// Replace the snapshot stored under `key`.
    async fn save(&self, key: &str, value: &Value) -> Result<(), StorageError>;
}

/// Snapshots as JSON files in one directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Store snapshots under `dir`. The directory is created on first save.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory snapshots are written to.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

#[async_trait]
impl SnapshotStorage for FileStorage {
    async fn load(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let path = self.path(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        let path = self.path(key)?;
        let bytes = serde_json::to_vec_pretty(value)?;

        tokio::fs::create_dir_all(&self.dir).await?;
        let temp_path = path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, &bytes).await?;
        tokio::fs::rename(&temp_path, &path).await?;

        debug!(key, bytes = bytes.len(), "snapshot saved");
        Ok(())
    }
}

/// Snapshots kept in memory only.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, Value>> {
        // A panic while holding the lock cannot leave a map half-written
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl SnapshotStorage for MemoryStorage {
    async fn load(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.entries().get(key).cloned())
    }

    async fn save(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        self.entries().insert(key.to_string(), value.clone());
        Ok(())
    }
}
