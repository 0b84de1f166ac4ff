//! Progress persistence
//!
//! Serializes session snapshots into a key-value store with expiration.
//! A dialogue is either "in progress" or "completed", never both; expired or
//! malformed records are treated as absent and removed on sight.

pub mod file;
pub mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::StorageConfig;
use crate::error::DrillResult;

const PROGRESS_KEY_PREFIX: &str = "dialogue_progress_";
const COMPLETED_KEY_PREFIX: &str = "completed_dialogue_";

/// Key-value store boundary. No transactional guarantees assumed.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String) -> DrillResult<()>;
    fn delete(&mut self, key: &str) -> DrillResult<()>;
    fn keys(&self) -> Vec<String>;
}

/// Envelope around every stored value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord<T> {
    pub data: T,
    /// Millisecond timestamp after which the record is dead
    pub expiration: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Completion marker payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub completed_at: i64,
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn days_ms(days: i64) -> i64 {
    days * 24 * 60 * 60 * 1000
}

/// Persistence adapter over any key-value store
pub struct ProgressStore<S: KeyValueStore> {
    store: S,
    config: StorageConfig,
}

impl<S: KeyValueStore> ProgressStore<S> {
    pub fn new(store: S, config: StorageConfig) -> Self {
        Self { store, config }
    }

    fn progress_key(dialogue_id: &str) -> String {
        format!("{}{}", PROGRESS_KEY_PREFIX, dialogue_id)
    }

    fn completed_key(dialogue_id: &str) -> String {
        format!("{}{}", COMPLETED_KEY_PREFIX, dialogue_id)
    }

    /// Save an in-progress snapshot. Write failures are logged and dropped:
    /// the session continues in memory and resumability becomes best-effort.
    pub fn save<T: Serialize>(&mut self, dialogue_id: &str, snapshot: &T) {
        if dialogue_id.is_empty() {
            return;
        }
        let key = Self::progress_key(dialogue_id);
        let now = now_ms();

        // Preserve the original creation date across overwrites
        let created_at = self
            .store
            .get(&key)
            .and_then(|raw| serde_json::from_str::<StoredRecord<serde_json::Value>>(&raw).ok())
            .map(|record| record.created_at)
            .unwrap_or(now);

        let record = StoredRecord {
            data: snapshot,
            expiration: now + days_ms(self.config.progress_ttl_days),
            created_at,
            updated_at: now,
        };

        match serde_json::to_string(&record) {
            Ok(serialized) => {
                if let Err(e) = self.store.set(&key, serialized) {
                    warn!("⚠️ Failed to save progress for '{}': {}", dialogue_id, e);
                } else {
                    debug!("💾 Progress saved for dialogue '{}'", dialogue_id);
                }
            }
            Err(e) => warn!("⚠️ Failed to serialize progress for '{}': {}", dialogue_id, e),
        }

        self.cleanup();
    }

    /// Load an in-progress snapshot, removing it if expired or malformed
    pub fn load<T: DeserializeOwned>(&mut self, dialogue_id: &str) -> Option<T> {
        self.read_live(&Self::progress_key(dialogue_id))
            .map(|record: StoredRecord<T>| record.data)
    }

    pub fn has_progress(&mut self, dialogue_id: &str) -> bool {
        self.read_live::<serde_json::Value>(&Self::progress_key(dialogue_id))
            .is_some()
    }

    pub fn clear(&mut self, dialogue_id: &str) {
        if self.store.delete(&Self::progress_key(dialogue_id)).is_ok() {
            debug!("🧹 Progress cleared for dialogue '{}'", dialogue_id);
        }
    }

    /// Record a completion and clear the in-progress record
    pub fn mark_completed(&mut self, dialogue_id: &str, completed_at_ms: i64) {
        let key = Self::completed_key(dialogue_id);
        let now = now_ms();
        let record = StoredRecord {
            data: CompletionRecord {
                completed_at: completed_at_ms,
            },
            expiration: now + days_ms(self.config.completed_ttl_days),
            created_at: now,
            updated_at: now,
        };
        match serde_json::to_string(&record) {
            Ok(serialized) => {
                if let Err(e) = self.store.set(&key, serialized) {
                    warn!("⚠️ Failed to record completion for '{}': {}", dialogue_id, e);
                }
            }
            Err(e) => warn!("⚠️ Failed to serialize completion for '{}': {}", dialogue_id, e),
        }
        self.clear(dialogue_id);
        info!("🏁 Dialogue '{}' marked completed", dialogue_id);
    }

    pub fn is_completed(&mut self, dialogue_id: &str) -> bool {
        self.read_live::<CompletionRecord>(&Self::completed_key(dialogue_id))
            .is_some()
    }

    /// Forget both progress and completion, so the dialogue starts fresh
    pub fn reset(&mut self, dialogue_id: &str) {
        self.clear(dialogue_id);
        let _ = self.store.delete(&Self::completed_key(dialogue_id));
        info!("🔄 Dialogue '{}' reset", dialogue_id);
    }

    /// Remove expired entries, then oldest entries while over budget
    pub fn cleanup(&mut self) {
        let now = now_ms();
        let mut removed = 0usize;

        let keys = self.owned_keys();
        for key in &keys {
            let Some(raw) = self.store.get(key) else { continue };
            match serde_json::from_str::<StoredRecord<serde_json::Value>>(&raw) {
                Ok(record) if record.expiration >= now => {}
                // Expired or unparseable either way
                _ => {
                    let _ = self.store.delete(key);
                    removed += 1;
                }
            }
        }

        let budget = self.config.max_bytes;
        if self.estimated_usage() > budget * 9 / 10 {
            warn!("⚠️ Storage usage high, evicting oldest records");
            let mut aged: Vec<(String, i64)> = self
                .owned_keys()
                .into_iter()
                .filter_map(|key| {
                    let raw = self.store.get(&key)?;
                    let updated_at = serde_json::from_str::<StoredRecord<serde_json::Value>>(&raw)
                        .map(|r| r.updated_at)
                        .unwrap_or(0);
                    Some((key, updated_at))
                })
                .collect();
            aged.sort_by_key(|(_, updated_at)| *updated_at);

            for (key, _) in aged {
                if self.estimated_usage() <= budget * 8 / 10 {
                    break;
                }
                let _ = self.store.delete(&key);
                removed += 1;
                debug!("🧹 Evicted old record: {}", key);
            }
        }

        if removed > 0 {
            debug!("🧹 Cleanup removed {} records", removed);
        }
    }

    /// Borrow the underlying store (tests and diagnostics)
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    fn owned_keys(&self) -> Vec<String> {
        self.store
            .keys()
            .into_iter()
            .filter(|k| k.starts_with(PROGRESS_KEY_PREFIX) || k.starts_with(COMPLETED_KEY_PREFIX))
            .collect()
    }

    fn estimated_usage(&self) -> usize {
        self.owned_keys()
            .iter()
            .map(|key| key.len() + self.store.get(key).map(|v| v.len()).unwrap_or(0))
            .sum()
    }

    fn read_live<T: DeserializeOwned>(&mut self, key: &str) -> Option<StoredRecord<T>> {
        let raw = self.store.get(key)?;
        let record: StoredRecord<T> = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(e) => {
                warn!("⚠️ Malformed record at '{}', removing: {}", key, e);
                let _ = self.store.delete(key);
                return None;
            }
        };
        if record.expiration < now_ms() {
            debug!("⏰ Record at '{}' expired, removing", key);
            let _ = self.store.delete(key);
            return None;
        }
        Some(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct FakeSnapshot {
        index: usize,
        skipped: HashSet<usize>,
    }

    fn progress_store() -> ProgressStore<MemoryStore> {
        ProgressStore::new(MemoryStore::new(), StorageConfig::default())
    }

    fn snapshot() -> FakeSnapshot {
        FakeSnapshot {
            index: 3,
            skipped: [1, 2].into_iter().collect(),
        }
    }

    #[test]
    fn test_save_load_round_trip() {
        let mut store = progress_store();
        store.save("d1", &snapshot());
        assert!(store.has_progress("d1"));
        let loaded: FakeSnapshot = store.load("d1").expect("should load");
        assert_eq!(loaded, snapshot());
        // Sets come back with identical membership
        assert!(loaded.skipped.contains(&1) && loaded.skipped.contains(&2));
    }

    #[test]
    fn test_expired_record_removed_on_read() {
        let mut store = progress_store();
        let key = ProgressStore::<MemoryStore>::progress_key("d1");
        let dead = StoredRecord {
            data: snapshot(),
            expiration: now_ms() - 1000,
            created_at: now_ms() - 2000,
            updated_at: now_ms() - 2000,
        };
        store
            .store_mut()
            .set(&key, serde_json::to_string(&dead).unwrap())
            .unwrap();

        assert!(store.load::<FakeSnapshot>("d1").is_none());
        assert!(!store.has_progress("d1"));
        assert!(store.store_mut().get(&key).is_none());
    }

    #[test]
    fn test_malformed_record_treated_absent() {
        let mut store = progress_store();
        let key = ProgressStore::<MemoryStore>::progress_key("d1");
        store.store_mut().set(&key, "{ broken".into()).unwrap();
        assert!(store.load::<FakeSnapshot>("d1").is_none());
        assert!(store.store_mut().get(&key).is_none());
    }

    #[test]
    fn test_mark_completed_clears_progress() {
        let mut store = progress_store();
        store.save("d1", &snapshot());
        store.mark_completed("d1", now_ms());
        assert!(!store.has_progress("d1"));
        assert!(store.is_completed("d1"));
    }

    #[test]
    fn test_reset_forgets_everything() {
        let mut store = progress_store();
        store.save("d1", &snapshot());
        store.mark_completed("d1", now_ms());
        store.reset("d1");
        assert!(!store.has_progress("d1"));
        assert!(!store.is_completed("d1"));
    }

    #[test]
    fn test_created_at_preserved_across_saves() {
        let mut store = progress_store();
        store.save("d1", &snapshot());
        let key = ProgressStore::<MemoryStore>::progress_key("d1");
        let first: StoredRecord<FakeSnapshot> =
            serde_json::from_str(&store.store_mut().get(&key).unwrap()).unwrap();
        store.save("d1", &snapshot());
        let second: StoredRecord<FakeSnapshot> =
            serde_json::from_str(&store.store_mut().get(&key).unwrap()).unwrap();
        assert_eq!(first.created_at, second.created_at);
        assert!(second.updated_at >= first.updated_at);
    }

    #[test]
    fn test_eviction_drops_oldest_first() {
        let config = StorageConfig {
            max_bytes: 200,
            ..StorageConfig::default()
        };
        let mut store = ProgressStore::new(MemoryStore::new(), config);

        // Seed two aged records directly, oldest first
        for (id, age) in [("old", 10_000), ("newer", 1_000)] {
            let key = ProgressStore::<MemoryStore>::progress_key(id);
            let record = StoredRecord {
                data: snapshot(),
                expiration: now_ms() + 100_000,
                created_at: now_ms() - age,
                updated_at: now_ms() - age,
            };
            store
                .store_mut()
                .set(&key, serde_json::to_string(&record).unwrap())
                .unwrap();
        }

        // A fresh save pushes usage over budget and triggers eviction
        store.save("current", &snapshot());
        assert!(
            store.store_mut().get("dialogue_progress_old").is_none(),
            "oldest record should be evicted first"
        );
    }
}
