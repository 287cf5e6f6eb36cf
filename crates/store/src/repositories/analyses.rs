use crate::models::{AnalysisFilter, AnalysisRecord, AnalysisStatus};
use crate::store::{
    format_timestamp, json_column, sql_int, timestamp_column, to_json_text, SqlResultExt,
    StructuredStore,
};
use chrono::Utc;
use gaitstore_core::{Error, Result};
use rusqlite::{params, OptionalExtension, Row};
use serde_json::{Map, Value};
use tracing::{debug, info};

const SELECT_ANALYSIS: &str = "SELECT id, video_path, status, created_at, updated_at, metadata, error_message FROM analyses";

fn map_analysis(row: &Row<'_>) -> rusqlite::Result<AnalysisRecord> {
    let status: String = row.get(2)?;
    let status = status.parse::<AnalysisStatus>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(AnalysisRecord {
        id: row.get(0)?,
        video_path: row.get(1)?,
        status,
        created_at: timestamp_column(row, 3)?,
        updated_at: timestamp_column(row, 4)?,
        metadata: json_column(row, 5)?,
        error_message: row.get(6)?,
    })
}

impl StructuredStore {
    /// Register a new analysis in the `pending` state.
    pub fn create_analysis(
        &self,
        video_path: &str,
        metadata: Map<String, Value>,
    ) -> Result<AnalysisRecord> {
        if video_path.trim().is_empty() {
            return Err(Error::configuration("video path must not be empty"));
        }

        let now = Utc::now();
        let record = AnalysisRecord {
            id: uuid::Uuid::new_v4().to_string(),
            video_path: video_path.to_string(),
            status: AnalysisStatus::Pending,
            created_at: now,
            updated_at: now,
            metadata,
            error_message: None,
        };
        let metadata_text = to_json_text(&record.id, &record.metadata)?;

        self.write("create analysis", |tx| {
            tx.execute(
                "INSERT INTO analyses (id, video_path, status, created_at, updated_at, metadata) VALUES (?1, ?2, ?3, ?4, ?4, ?5)",
                params![
                    record.id,
                    record.video_path,
                    record.status.as_str(),
                    format_timestamp(&now),
                    metadata_text
                ],
            )
            .sql_context("create analysis")?;
            Ok(())
        })?;

        info!(id = %record.id, video = %record.video_path, "Created analysis");
        Ok(record)
    }

    pub fn get_analysis(&self, id: &str) -> Result<Option<AnalysisRecord>> {
        self.read("get analysis", |tx| {
            tx.query_row(
                &format!("{SELECT_ANALYSIS} WHERE id = ?1"),
                params![id],
                map_analysis,
            )
            .optional()
            .sql_context("get analysis")
        })
    }

    /// Move an analysis to `status`. Returns `false` when no such analysis exists.
    ///
    /// `error_message` replaces the stored message, so passing `None` clears it.
    pub fn update_analysis_status(
        &self,
        id: &str,
        status: AnalysisStatus,
        error_message: Option<&str>,
    ) -> Result<bool> {
        let changed = self.write("update analysis status", |tx| {
            tx.execute(
                "UPDATE analyses SET status = ?2, error_message = ?3, updated_at = ?4 WHERE id = ?1",
                params![id, status.as_str(), error_message, format_timestamp(&Utc::now())],
            )
            .sql_context("update analysis status")
        })?;

        debug!(id, status = %status, updated = changed > 0, "Updated analysis status");
        Ok(changed > 0)
    }

    /// Merge `patch` into the analysis metadata. Returns `false` when no such analysis exists.
    pub fn update_analysis_metadata(&self, id: &str, patch: Map<String, Value>) -> Result<bool> {
        self.write("update analysis metadata", |tx| {
            let current: Option<String> = tx
                .query_row(
                    "SELECT metadata FROM analyses WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()
                .sql_context("update analysis metadata")?;
            let Some(current) = current else {
                return Ok(false);
            };

            let mut metadata: Map<String, Value> = serde_json::from_str(&current)
                .map_err(|e| Error::serialization(id, "decode analysis metadata", e))?;
            metadata.extend(patch);

            tx.execute(
                "UPDATE analyses SET metadata = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, to_json_text(id, &metadata)?, format_timestamp(&Utc::now())],
            )
            .sql_context("update analysis metadata")?;
            Ok(true)
        })
    }

    /// List analyses newest first.
    pub fn list_analyses(&self, filter: &AnalysisFilter) -> Result<Vec<AnalysisRecord>> {
        self.read("list analyses", |tx| {
            let limit = sql_int(filter.limit);
            let offset = sql_int(filter.offset);
            let rows = match filter.status {
                Some(status) => {
                    let mut stmt = tx
                        .prepare(&format!(
                            "{SELECT_ANALYSIS} WHERE status = ?1 ORDER BY created_at DESC, rowid DESC LIMIT ?2 OFFSET ?3"
                        ))
                        .sql_context("list analyses")?;
                    let rows = stmt
                        .query_map(params![status.as_str(), limit, offset], map_analysis)
                        .sql_context("list analyses")?;
                    rows.collect::<rusqlite::Result<Vec<_>>>()
                }
                None => {
                    let mut stmt = tx
                        .prepare(&format!(
                            "{SELECT_ANALYSIS} ORDER BY created_at DESC, rowid DESC LIMIT ?1 OFFSET ?2"
                        ))
                        .sql_context("list analyses")?;
                    let rows = stmt
                        .query_map(params![limit, offset], map_analysis)
                        .sql_context("list analyses")?;
                    rows.collect::<rusqlite::Result<Vec<_>>>()
                }
            };
            rows.sql_context("list analyses")
        })
    }

    pub fn count_analyses(&self, status: Option<AnalysisStatus>) -> Result<u64> {
        self.read("count analyses", |tx| {
            let count: i64 = match status {
                Some(status) => tx.query_row(
                    "SELECT COUNT(*) FROM analyses WHERE status = ?1",
                    params![status.as_str()],
                    |row| row.get::<_, i64>(0),
                ),
                None => tx.query_row("SELECT COUNT(*) FROM analyses", [], |row| {
                    row.get::<_, i64>(0)
                }),
            }
            .sql_context("count analyses")?;
            Ok(u64::try_from(count).unwrap_or_default())
        })
    }

    /// Delete an analysis and its classification.
    pub fn delete_analysis(&self, id: &str) -> Result<bool> {
        let deleted = self.write("delete analysis", |tx| {
            tx.execute("DELETE FROM analyses WHERE id = ?1", params![id])
                .sql_context("delete analysis")
        })?;

        if deleted > 0 {
            info!(id, "Deleted analysis");
        }
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(key: &str, value: Value) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(key.to_string(), value);
        map
    }

    #[test]
    fn test_create_starts_pending() {
        let store = StructuredStore::open_in_memory().unwrap();
        let record = store
            .create_analysis("videos/walk.mp4", meta("fps", Value::from(30)))
            .unwrap();

        let loaded = store.get_analysis(&record.id).unwrap().unwrap();
        assert_eq!(loaded.status, AnalysisStatus::Pending);
        assert_eq!(loaded.metadata["fps"], 30);
        assert_eq!(loaded.error_message, None);
        assert_eq!(loaded.created_at, record.created_at);
    }

    #[test]
    fn test_empty_video_path_is_rejected() {
        let store = StructuredStore::open_in_memory().unwrap();
        let err = store.create_analysis("  ", Map::new()).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_status_transition_records_error() {
        let store = StructuredStore::open_in_memory().unwrap();
        let record = store.create_analysis("a.mp4", Map::new()).unwrap();

        assert!(store
            .update_analysis_status(&record.id, AnalysisStatus::Failed, Some("decoder crashed"))
            .unwrap());
        let loaded = store.get_analysis(&record.id).unwrap().unwrap();
        assert_eq!(loaded.status, AnalysisStatus::Failed);
        assert_eq!(loaded.error_message.as_deref(), Some("decoder crashed"));
        assert!(loaded.updated_at >= loaded.created_at);

        assert!(!store
            .update_analysis_status("missing", AnalysisStatus::Completed, None)
            .unwrap());
    }

    #[test]
    fn test_metadata_patch_merges() {
        let store = StructuredStore::open_in_memory().unwrap();
        let record = store
            .create_analysis("a.mp4", meta("camera", Value::from("left")))
            .unwrap();

        assert!(store
            .update_analysis_metadata(&record.id, meta("frames", Value::from(240)))
            .unwrap());
        let loaded = store.get_analysis(&record.id).unwrap().unwrap();
        assert_eq!(loaded.metadata["camera"], "left");
        assert_eq!(loaded.metadata["frames"], 240);

        assert!(!store.update_analysis_metadata("missing", Map::new()).unwrap());
    }

    #[test]
    fn test_get_missing_is_none() {
        let store = StructuredStore::open_in_memory().unwrap();
        assert!(store.get_analysis("nope").unwrap().is_none());
        assert!(!store.delete_analysis("nope").unwrap());
    }
}
