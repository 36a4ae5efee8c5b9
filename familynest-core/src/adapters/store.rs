//! Key-value store adapters
//!
//! - `MemoryStore`: process-local, for tests and embedding
//! - `FileStore`: a JSON object on disk, the CLI's equivalent of browser
//!   local storage. Writes hold an exclusive lock on a sidecar lock file.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use fs2::FileExt;

use crate::domain::result::{Error, Result};
use crate::ports::KeyValueStore;

/// In-memory key-value store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|e| Error::store(format!("Lock poisoned: {}", e)))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// JSON-file key-value store
///
/// The whole file is re-read on every access so that separate CLI
/// invocations observe each other's writes.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl FileStore {
    /// Default file name inside the app directory
    pub const FILE_NAME: &'static str = "storage.json";

    /// Open (or lazily create) the store at `app_dir/storage.json`
    pub fn open(app_dir: &Path) -> Result<Self> {
        fs::create_dir_all(app_dir)?;
        Ok(Self::at_path(app_dir.join(Self::FILE_NAME)))
    }

    /// Use an explicit file path
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let lock_path = path.with_extension("lock");
        Self { path, lock_path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_file(&self) -> anyhow::Result<File> {
        OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)
            .with_context(|| format!("Failed to open lock file {:?}", self.lock_path))
    }

    fn read_entries(&self) -> anyhow::Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {:?}", self.path))?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content).with_context(|| format!("Corrupt store file {:?}", self.path))
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> anyhow::Result<()> {
        let tmp_path = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(entries)?;
        fs::write(&tmp_path, content).with_context(|| format!("Failed to write {:?}", tmp_path))?;
        fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("Failed to replace {:?}", self.path))?;
        Ok(())
    }

    /// Read-modify-write under an exclusive lock.
    ///
    /// A corrupt file is replaced rather than blocking every later write.
    fn update<F>(&self, apply: F) -> anyhow::Result<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let lock = self.lock_file()?;
        lock.lock_exclusive().context("Failed to lock store")?;

        let result = (|| {
            let mut entries = match self.read_entries() {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(path = ?self.path, error = %e, "Discarding unreadable store file");
                    BTreeMap::new()
                }
            };
            apply(&mut entries);
            self.write_entries(&entries)
        })();

        let _ = lock.unlock();
        result
    }
}

fn store_error(e: anyhow::Error) -> Error {
    Error::store(format!("{:#}", e))
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let lock = self.lock_file().map_err(store_error)?;
        lock.lock_shared()
            .map_err(|e| Error::store(format!("Failed to lock store: {}", e)))?;
        let entries = self.read_entries();
        let _ = lock.unlock();
        Ok(entries.map_err(store_error)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
        .map_err(store_error)
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.update(|entries| {
            entries.remove(key);
        })
        .map_err(store_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.get("token").unwrap(), None);

        store.set("token", "abc").unwrap();
        assert_eq!(store.get("token").unwrap(), Some("abc".to_string()));

        store.remove("token").unwrap();
        store.remove("token").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_file_store_persists_between_instances() {
        let dir = tempdir().unwrap();
        {
            let store = FileStore::open(dir.path()).unwrap();
            store.set("token", "abc").unwrap();
            store.set("user", r#"{"id":"1"}"#).unwrap();
        }

        let store = FileStore::open(dir.path()).unwrap();
        assert_eq!(store.get("token").unwrap(), Some("abc".to_string()));
        assert_eq!(store.get("user").unwrap(), Some(r#"{"id":"1"}"#.to_string()));
        assert_eq!(store.get("missing").unwrap(), None);
    }

    #[test]
    fn test_file_store_missing_file_reads_empty() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert_eq!(store.get("token").unwrap(), None);
        store.remove("token").unwrap();
    }

    #[test]
    fn test_file_store_corrupt_file() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        fs::write(store.path(), "{not json").unwrap();

        let err = store.get("token").unwrap_err();
        assert!(matches!(err, Error::Store(_)));

        // Writing recovers the file
        store.set("token", "fresh").unwrap();
        assert_eq!(store.get("token").unwrap(), Some("fresh".to_string()));
    }
}
