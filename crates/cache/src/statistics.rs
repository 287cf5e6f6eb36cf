//! Cache statistics tracking and reporting

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::SystemTime;

/// Counters for result cache traffic plus per-tier entry counts
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStatistics {
    pub store_hits: u64,
    pub file_hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub file_write_failures: u64,
    pub file_read_failures: u64,
    pub store_entries: u64,
    pub file_entries: u64,
    pub last_purge: Option<SystemTime>,
}

impl CacheStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_hits(&self) -> u64 {
        self.store_hits + self.file_hits
    }

    /// Hit rate as a percentage of lookups
    pub fn hit_rate(&self) -> f64 {
        let total = self.total_hits() + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.total_hits() as f64 / total as f64) * 100.0
        }
    }

    pub fn total_operations(&self) -> u64 {
        self.total_hits() + self.misses + self.writes
    }
}

/// Thread-safe statistics container
#[derive(Debug, Clone, Default)]
pub struct StatsContainer {
    stats: Arc<RwLock<CacheStatistics>>,
}

impl StatsContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_store_hit(&self) {
        self.stats.write().store_hits += 1;
    }

    pub fn record_file_hit(&self) {
        self.stats.write().file_hits += 1;
    }

    pub fn record_miss(&self) {
        self.stats.write().misses += 1;
    }

    pub fn record_write(&self) {
        self.stats.write().writes += 1;
    }

    pub fn record_file_write_failure(&self) {
        self.stats.write().file_write_failures += 1;
    }

    pub fn record_file_read_failure(&self) {
        self.stats.write().file_read_failures += 1;
    }

    pub fn record_purge(&self) {
        self.stats.write().last_purge = Some(SystemTime::now());
    }

    pub fn snapshot(&self) -> CacheStatistics {
        self.stats.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate_counts_both_tiers() {
        let container = StatsContainer::new();
        container.record_store_hit();
        container.record_file_hit();
        container.record_miss();
        container.record_write();

        let snapshot = container.snapshot();
        assert_eq!(snapshot.total_hits(), 2);
        assert_eq!(snapshot.total_operations(), 4);
        assert!((snapshot.hit_rate() - 66.666_666).abs() < 0.001);
    }

    #[test]
    fn test_empty_hit_rate_is_zero() {
        assert_eq!(CacheStatistics::new().hit_rate(), 0.0);
    }

    #[test]
    fn test_clones_share_counters() {
        let container = StatsContainer::new();
        let clone = container.clone();
        clone.record_file_write_failure();
        assert_eq!(container.snapshot().file_write_failures, 1);
    }
}
