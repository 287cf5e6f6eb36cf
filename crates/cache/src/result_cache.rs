//! Read-through cache over the structured store and the file tier.

use crate::file_cache::FileCache;
use crate::statistics::{CacheStatistics, StatsContainer};
use gaitstore_config::GaitStoreConfig;
use gaitstore_core::{PoseFrame, Result, SequenceKey};
use gaitstore_store::{PoseAnalysisResult, StructuredStore};
use gaitstore_utils::hashing::stable_hash;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Tier that answered a lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheTier {
    Store,
    File,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CachedResult {
    pub result: Value,
    pub tier: CacheTier,
    /// Hash of the pose sequence, known only for store hits
    pub content_hash: Option<String>,
}

/// Two-tier result cache.
///
/// The structured store is the durable tier and is authoritative whenever
/// it holds a row, regardless of age. The file tier is disposable: its
/// failures are logged and treated as misses, while store failures
/// propagate to the caller.
#[derive(Debug)]
pub struct ResultCache {
    store: Arc<StructuredStore>,
    files: Option<FileCache>,
    stats: StatsContainer,
}

impl ResultCache {
    pub fn new(store: Arc<StructuredStore>, files: Option<FileCache>) -> Self {
        Self {
            store,
            files,
            stats: StatsContainer::new(),
        }
    }

    pub fn from_config(config: &GaitStoreConfig, store: Arc<StructuredStore>) -> Result<Self> {
        let files = if config.cache.file_cache_enabled {
            Some(FileCache::from_config(config)?)
        } else {
            None
        };
        Ok(Self::new(store, files))
    }

    pub fn store(&self) -> &StructuredStore {
        &self.store
    }

    pub fn file_cache(&self) -> Option<&FileCache> {
        self.files.as_ref()
    }

    /// Look up a result: store row first, then a fresh file entry.
    pub fn get(&self, dataset_id: &str, sequence_id: &str) -> Result<Option<CachedResult>> {
        let key = SequenceKey::new(dataset_id, sequence_id)?;

        if let Some(row) = self.store.get_pose_result(dataset_id, sequence_id)? {
            self.stats.record_store_hit();
            debug!(%key, version = row.version, "Result cache store hit");
            return Ok(Some(CachedResult {
                result: row.analysis,
                tier: CacheTier::Store,
                content_hash: Some(row.content_hash),
            }));
        }

        if let Some(files) = &self.files {
            match files.get(&key) {
                Ok(Some(result)) => {
                    self.stats.record_file_hit();
                    debug!(%key, "Result cache file hit");
                    return Ok(Some(CachedResult {
                        result,
                        tier: CacheTier::File,
                        content_hash: None,
                    }));
                }
                Ok(None) => {}
                Err(e) => {
                    self.stats.record_file_read_failure();
                    warn!(%key, error = %e, "File cache read failed, treating as miss");
                }
            }
        }

        self.stats.record_miss();
        debug!(%key, "Result cache miss");
        Ok(None)
    }

    /// Persist a freshly computed result in both tiers.
    ///
    /// The store row is written first and its failure is returned. The file
    /// write is best-effort.
    pub fn put(
        &self,
        dataset_id: &str,
        sequence_id: &str,
        pose_sequence: &[PoseFrame],
        result: &Value,
    ) -> Result<PoseAnalysisResult> {
        let key = SequenceKey::new(dataset_id, sequence_id)?;
        let content_hash = stable_hash(pose_sequence)?;

        let row = self
            .store
            .save_pose_result(dataset_id, sequence_id, result, &content_hash)?;
        self.stats.record_write();

        if let Some(files) = &self.files {
            if let Err(e) = files.put(&key, result) {
                self.stats.record_file_write_failure();
                warn!(%key, error = %e, "File cache write failed");
            }
        }

        debug!(%key, version = row.version, "Cached analysis result");
        Ok(row)
    }

    /// Whether either tier can answer a lookup without recomputation.
    pub fn exists(&self, dataset_id: &str, sequence_id: &str) -> Result<bool> {
        let key = SequenceKey::new(dataset_id, sequence_id)?;
        if self.store.pose_result_exists(dataset_id, sequence_id, None)? {
            return Ok(true);
        }

        Ok(match &self.files {
            Some(files) => files.is_fresh(&key).unwrap_or_else(|e| {
                warn!(%key, error = %e, "File cache lookup failed, treating as absent");
                false
            }),
            None => false,
        })
    }

    /// Whether the stored result was computed from exactly this pose sequence.
    pub fn is_current(
        &self,
        dataset_id: &str,
        sequence_id: &str,
        pose_sequence: &[PoseFrame],
    ) -> Result<bool> {
        let content_hash = stable_hash(pose_sequence)?;
        self.store
            .pose_result_exists(dataset_id, sequence_id, Some(&content_hash))
    }

    /// Clear file-tier entries; store rows are untouched.
    pub fn clear(&self, dataset_id: Option<&str>, sequence_id: Option<&str>) -> Result<usize> {
        match &self.files {
            Some(files) => {
                let removed = files.clear(dataset_id, sequence_id)?;
                info!(?dataset_id, ?sequence_id, removed, "Cleared result cache");
                Ok(removed)
            }
            None => Ok(0),
        }
    }

    /// Remove a result from both tiers.
    ///
    /// The file entry goes first so a failure cannot leave a file copy that
    /// would answer lookups once the store row is gone.
    pub fn delete_analysis(&self, dataset_id: &str, sequence_id: &str) -> Result<bool> {
        let key = SequenceKey::new(dataset_id, sequence_id)?;
        let file_removed = match &self.files {
            Some(files) => files.remove(&key)?,
            None => false,
        };
        let row_removed = self.store.delete_pose_result(dataset_id, sequence_id)?;

        let removed = file_removed || row_removed;
        if removed {
            info!(%key, "Deleted cached analysis");
        }
        Ok(removed)
    }

    pub fn purge_expired(&self) -> Result<usize> {
        let removed = match &self.files {
            Some(files) => files.purge_expired()?,
            None => 0,
        };
        self.stats.record_purge();
        info!(removed, "Purged expired file cache entries");
        Ok(removed)
    }

    /// Traffic counters plus current entry counts per tier.
    pub fn statistics(&self) -> Result<CacheStatistics> {
        let mut stats = self.stats.snapshot();
        stats.store_entries = self.store.statistics()?.pose_results;
        stats.file_entries = match &self.files {
            Some(files) => files.entry_count().map(|n| n as u64).unwrap_or_else(|e| {
                warn!(error = %e, "Could not count file cache entries");
                0
            }),
            None => 0,
        };
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gaitstore_core::{Error, Keypoint};
    use gaitstore_storage::StorageManager;
    use serde_json::json;
    use std::time::Duration;
    use tempfile::TempDir;

    fn frames(x: f64) -> Vec<PoseFrame> {
        vec![PoseFrame::new(
            0,
            vec![Keypoint {
                name: "left_ankle".to_string(),
                x,
                y: 0.5,
                confidence: 0.9,
            }],
        )]
    }

    fn cache(temp: &TempDir) -> ResultCache {
        let store = Arc::new(StructuredStore::open_in_memory().unwrap());
        let files = FileCache::new(
            StorageManager::new(temp.path()).unwrap(),
            Duration::from_secs(3600),
        );
        ResultCache::new(store, Some(files))
    }

    #[test]
    fn test_put_writes_both_tiers() {
        let temp = TempDir::new().unwrap();
        let cache = cache(&temp);
        cache.put("gavd", "s1", &frames(0.1), &json!({"cadence": 98})).unwrap();

        let key = SequenceKey::new("gavd", "s1").unwrap();
        assert!(cache.file_cache().unwrap().is_fresh(&key).unwrap());
        let hit = cache.get("gavd", "s1").unwrap().unwrap();
        assert_eq!(hit.tier, CacheTier::Store);
        assert_eq!(hit.result, json!({"cadence": 98}));
    }

    #[test]
    fn test_is_current_tracks_pose_hash() {
        let temp = TempDir::new().unwrap();
        let cache = cache(&temp);
        cache.put("gavd", "s1", &frames(0.1), &json!({})).unwrap();

        assert!(cache.is_current("gavd", "s1", &frames(0.1)).unwrap());
        assert!(!cache.is_current("gavd", "s1", &frames(0.2)).unwrap());
    }

    #[test]
    fn test_invalid_identifiers_are_rejected() {
        let temp = TempDir::new().unwrap();
        let cache = cache(&temp);
        let err = cache.get("../etc", "s1").unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_without_file_tier() {
        let cache = ResultCache::new(Arc::new(StructuredStore::open_in_memory().unwrap()), None);
        assert!(cache.get("d", "s").unwrap().is_none());
        cache.put("d", "s", &frames(0.3), &json!({"ok": true})).unwrap();
        assert!(cache.exists("d", "s").unwrap());
        assert_eq!(cache.clear(None, None).unwrap(), 0);

        let stats = cache.statistics().unwrap();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.writes, 1);
        assert_eq!(stats.store_entries, 1);
        assert_eq!(stats.file_entries, 0);
    }
}
