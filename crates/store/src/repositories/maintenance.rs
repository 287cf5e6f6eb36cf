use crate::models::{AnalysisStatus, StoreStatistics};
use crate::store::{SqlResultExt, StructuredStore};
use gaitstore_core::{Error, Result};
use rusqlite::params;
use std::path::Path;
use tracing::info;

impl StructuredStore {
    /// Rebuild the database file, reclaiming free pages.
    pub fn vacuum(&self) -> Result<()> {
        self.with_connection(|conn| conn.execute_batch("VACUUM").sql_context("vacuum"))?;
        info!("Vacuumed structured store");
        Ok(())
    }

    /// Write a consistent copy of the live database to `destination`.
    ///
    /// The copy is produced next to the destination and renamed into place,
    /// so an existing file at `destination` is replaced only once the copy
    /// is complete.
    pub fn backup_to(&self, destination: &Path) -> Result<()> {
        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::file_system(parent, "create snapshot directory", e))?;
        }

        let staging = gaitstore_utils::atomic_file::temp_path_for(destination)?;
        let staging_text = staging.to_str().ok_or_else(|| {
            Error::configuration(format!(
                "snapshot path '{}' is not valid UTF-8",
                staging.display()
            ))
        })?;

        let copied = self.with_connection(|conn| {
            conn.execute("VACUUM INTO ?1", params![staging_text])
                .sql_context("snapshot database")
        });
        if let Err(e) = copied {
            let _ = std::fs::remove_file(&staging);
            return Err(e);
        }

        std::fs::rename(&staging, destination).map_err(|e| {
            let _ = std::fs::remove_file(&staging);
            Error::file_system(destination, "install snapshot", e)
        })?;

        info!(destination = %destination.display(), "Wrote database snapshot");
        Ok(())
    }

    pub fn statistics(&self) -> Result<StoreStatistics> {
        self.read("collect statistics", |tx| {
            let count = |sql: &str| -> Result<u64> {
                let n: i64 = tx
                    .query_row(sql, [], |row| row.get(0))
                    .sql_context("collect statistics")?;
                Ok(u64::try_from(n).unwrap_or_default())
            };

            let mut stats = StoreStatistics::default();
            for status in AnalysisStatus::ALL {
                stats.analyses_by_status.insert(status.as_str().to_string(), 0);
            }

            let mut stmt = tx
                .prepare("SELECT status, COUNT(*) FROM analyses GROUP BY status")
                .sql_context("collect statistics")?;
            let rows = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
                .sql_context("collect statistics")?;
            for row in rows {
                let (status, n) = row.sql_context("collect statistics")?;
                stats
                    .analyses_by_status
                    .insert(status, u64::try_from(n).unwrap_or_default());
            }

            stats.classifications = count("SELECT COUNT(*) FROM classification_results")?;
            stats.training_datasets = count("SELECT COUNT(*) FROM training_datasets")?;
            stats.training_samples = count("SELECT COUNT(*) FROM training_samples")?;
            stats.pose_results = count("SELECT COUNT(*) FROM pose_analysis_results")?;

            let page_count = count("PRAGMA page_count")?;
            let page_size = count("PRAGMA page_size")?;
            stats.database_size_bytes = page_count * page_size;

            Ok(stats)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};
    use tempfile::TempDir;

    #[test]
    fn test_statistics_counts_every_status() {
        let store = StructuredStore::open_in_memory().unwrap();
        let a = store.create_analysis("a.mp4", Map::new()).unwrap();
        store.create_analysis("b.mp4", Map::new()).unwrap();
        store
            .update_analysis_status(&a.id, AnalysisStatus::Completed, None)
            .unwrap();
        store.save_pose_result("d", "s", &json!({}), "h").unwrap();

        let stats = store.statistics().unwrap();
        assert_eq!(stats.analyses_by_status["pending"], 1);
        assert_eq!(stats.analyses_by_status["completed"], 1);
        assert_eq!(stats.analyses_by_status["failed"], 0);
        assert_eq!(stats.total_analyses(), 2);
        assert_eq!(stats.pose_results, 1);
        assert!(stats.database_size_bytes > 0);
    }

    #[test]
    fn test_snapshot_is_openable_copy() {
        let temp = TempDir::new().unwrap();
        let store = StructuredStore::open(temp.path().join("live.db")).unwrap();
        store.save_pose_result("d", "s", &json!({"k": 1}), "h").unwrap();

        let snapshot = temp.path().join("snapshots").join("copy.db");
        store.backup_to(&snapshot).unwrap();
        // A second snapshot replaces the first
        store.backup_to(&snapshot).unwrap();

        let copy = StructuredStore::open(&snapshot).unwrap();
        let row = copy.get_pose_result("d", "s").unwrap().unwrap();
        assert_eq!(row.analysis, json!({"k": 1}));
    }

    #[test]
    fn test_vacuum_keeps_rows() {
        let temp = TempDir::new().unwrap();
        let store = StructuredStore::open(temp.path().join("live.db")).unwrap();
        store.create_analysis("a.mp4", Map::new()).unwrap();
        store.vacuum().unwrap();
        assert_eq!(store.count_analyses(None).unwrap(), 1);
    }
}
