//! JSON-file-backed key-value store
//!
//! One pretty-printed JSON object per store file, written through on every
//! mutation so an abrupt termination loses at most the in-flight write.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::warn;

use super::KeyValueStore;
use crate::error::DrillResult;

#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: HashMap<String, String>,
}

impl JsonFileStore {
    /// Open a store file, creating parent directories as needed. A corrupt
    /// file is backed up and replaced with an empty store.
    pub fn open(path: &Path) -> DrillResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let entries = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            match serde_json::from_str(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("⚠️ Store file corrupted, starting empty: {}", e);
                    let backup = path.with_extension("json.corrupt");
                    let _ = std::fs::rename(path, &backup);
                    HashMap::new()
                }
            }
        } else {
            HashMap::new()
        };

        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    /// Open the default store under the platform data directory
    pub fn open_default() -> DrillResult<Self> {
        let path = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lingodrill")
            .join("progress.json");
        Self::open(&path)
    }

    fn persist(&self) -> DrillResult<()> {
        let content = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> DrillResult<()> {
        self.entries.insert(key.to_string(), value);
        self.persist()
    }

    fn delete(&mut self, key: &str) -> DrillResult<()> {
        if self.entries.remove(key).is_some() {
            self.persist()?;
        }
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_round_trip_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("progress.json");

        {
            let mut store = JsonFileStore::open(&path).unwrap();
            store.set("k", "v".into()).unwrap();
        }

        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.get("k").as_deref(), Some("v"));
    }

    #[test]
    fn test_corrupt_file_backed_up() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("progress.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = JsonFileStore::open(&path).unwrap();
        assert!(store.keys().is_empty());
        assert!(path.with_extension("json.corrupt").exists());
    }

    #[test]
    fn test_delete_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("progress.json");

        let mut store = JsonFileStore::open(&path).unwrap();
        store.set("k", "v".into()).unwrap();
        store.delete("k").unwrap();

        let reopened = JsonFileStore::open(&path).unwrap();
        assert!(reopened.get("k").is_none());
    }
}
