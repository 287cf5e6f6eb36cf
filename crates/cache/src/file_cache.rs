//! Disposable file tier: JSON results under `pose_results/<dataset>/<sequence>`.

use gaitstore_config::GaitStoreConfig;
use gaitstore_core::{Result, SequenceKey, JSON_BACKEND, POSE_RESULTS_NAMESPACE};
use gaitstore_storage::{SaveOptions, StorageManager};
use serde_json::Value;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use tracing::debug;

/// TTL-bounded cache of analysis results kept in the storage root.
///
/// Entries expire `ttl` after their last write, measured from the artifact
/// mtime. Content hashes play no part in file-tier freshness.
#[derive(Debug)]
pub struct FileCache {
    storage: StorageManager,
    ttl: Duration,
}

impl FileCache {
    pub fn new(storage: StorageManager, ttl: Duration) -> Self {
        Self { storage, ttl }
    }

    pub fn from_config(config: &GaitStoreConfig) -> Result<Self> {
        Ok(Self::new(
            StorageManager::from_config(config)?,
            config.cache_ttl(),
        ))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn storage(&self) -> &StorageManager {
        &self.storage
    }

    fn storage_key(key: &SequenceKey) -> String {
        format!(
            "{POSE_RESULTS_NAMESPACE}/{}/{}",
            key.dataset_id, key.sequence_id
        )
    }

    fn parse_storage_key(storage_key: &str) -> Option<SequenceKey> {
        let rest = storage_key.strip_prefix(POSE_RESULTS_NAMESPACE)?.strip_prefix('/')?;
        let (dataset, sequence) = rest.split_once('/')?;
        SequenceKey::new(dataset, sequence).ok()
    }

    /// Age of the entry, `None` when absent
    fn age(&self, storage_key: &str) -> Result<Option<Duration>> {
        let Some(modified) = self.storage.modified(storage_key)? else {
            return Ok(None);
        };
        // An mtime in the future counts as brand new
        Ok(Some(
            SystemTime::now()
                .duration_since(modified)
                .unwrap_or(Duration::ZERO),
        ))
    }

    fn is_fresh_key(&self, storage_key: &str) -> Result<bool> {
        Ok(self.age(storage_key)?.is_some_and(|age| age <= self.ttl))
    }

    /// Whether a non-expired entry exists
    pub fn is_fresh(&self, key: &SequenceKey) -> Result<bool> {
        self.is_fresh_key(&Self::storage_key(key))
    }

    /// Fresh entry for `key`, `None` when missing or expired
    pub fn get(&self, key: &SequenceKey) -> Result<Option<Value>> {
        let storage_key = Self::storage_key(key);
        if !self.is_fresh_key(&storage_key)? {
            return Ok(None);
        }
        self.storage.load_with(&storage_key, JSON_BACKEND).map(Some)
    }

    pub fn put(&self, key: &SequenceKey, result: &Value) -> Result<PathBuf> {
        let storage_key = Self::storage_key(key);
        self.storage
            .save(&storage_key, result, SaveOptions::new().backend(JSON_BACKEND))
    }

    pub fn remove(&self, key: &SequenceKey) -> Result<bool> {
        self.storage.delete(&Self::storage_key(key))
    }

    /// Every cached sequence key, expired entries included
    pub fn keys(&self) -> Result<Vec<SequenceKey>> {
        Ok(self
            .storage
            .list_keys(Some(&format!("{POSE_RESULTS_NAMESPACE}/")))?
            .iter()
            .filter_map(|k| Self::parse_storage_key(k))
            .collect())
    }

    pub fn entry_count(&self) -> Result<usize> {
        Ok(self.keys()?.len())
    }

    /// Remove entries matching the optional dataset and sequence filters.
    pub fn clear(&self, dataset_id: Option<&str>, sequence_id: Option<&str>) -> Result<usize> {
        let mut removed = 0;
        for key in self.keys()? {
            let dataset_matches = dataset_id.map_or(true, |d| key.dataset_id == d);
            let sequence_matches = sequence_id.map_or(true, |s| key.sequence_id == s);
            if dataset_matches && sequence_matches && self.remove(&key)? {
                removed += 1;
            }
        }
        debug!(?dataset_id, ?sequence_id, removed, "Cleared file cache entries");
        Ok(removed)
    }

    /// Remove every entry older than the TTL.
    pub fn purge_expired(&self) -> Result<usize> {
        let mut removed = 0;
        for key in self.keys()? {
            let storage_key = Self::storage_key(&key);
            let expired = self.age(&storage_key)?.is_some_and(|age| age > self.ttl);
            if expired && self.storage.delete(&storage_key)? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}
