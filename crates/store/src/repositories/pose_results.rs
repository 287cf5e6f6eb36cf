use crate::models::{PoseAnalysisResult, PoseResultFilter};
use crate::store::{
    format_timestamp, json_column, sql_int, timestamp_column, to_json_text, SqlResultExt,
    StructuredStore,
};
use chrono::Utc;
use gaitstore_core::{Error, Result};
use rusqlite::{params, OptionalExtension, Row};
use serde_json::Value;
use tracing::{debug, info};

const SELECT_POSE_RESULT: &str = "SELECT id, dataset_id, sequence_id, analysis_blob, content_hash, created_at, updated_at, version FROM pose_analysis_results";

fn map_pose_result(row: &Row<'_>) -> rusqlite::Result<PoseAnalysisResult> {
    Ok(PoseAnalysisResult {
        id: row.get(0)?,
        dataset_id: row.get(1)?,
        sequence_id: row.get(2)?,
        analysis: json_column(row, 3)?,
        content_hash: row.get(4)?,
        created_at: timestamp_column(row, 5)?,
        updated_at: timestamp_column(row, 6)?,
        version: row.get(7)?,
    })
}

impl StructuredStore {
    /// Insert or replace the result for `(dataset_id, sequence_id)`.
    ///
    /// The first insert assigns the id and `version = 1`; each replacement
    /// keeps the id and `created_at`, refreshes the payload and hash, and
    /// increments `version`.
    pub fn save_pose_result(
        &self,
        dataset_id: &str,
        sequence_id: &str,
        analysis: &Value,
        content_hash: &str,
    ) -> Result<PoseAnalysisResult> {
        if dataset_id.is_empty() || sequence_id.is_empty() {
            return Err(Error::configuration(
                "pose results need both a dataset id and a sequence id",
            ));
        }

        let now = Utc::now();
        // Distinct pairs can join to the same prefix; the uuid keeps ids unique
        let id = format!(
            "{dataset_id}_{sequence_id}_{}_{}",
            now.timestamp_millis(),
            uuid::Uuid::new_v4().simple()
        );
        let blob = to_json_text(&id, analysis)?;
        let timestamp = format_timestamp(&now);

        let saved = self.write("save pose result", |tx| {
            tx.execute(
                "INSERT INTO pose_analysis_results
                    (id, dataset_id, sequence_id, analysis_blob, content_hash, created_at, updated_at, version)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, 1)
                 ON CONFLICT(dataset_id, sequence_id) DO UPDATE SET
                    analysis_blob = excluded.analysis_blob,
                    content_hash = excluded.content_hash,
                    updated_at = excluded.updated_at,
                    version = pose_analysis_results.version + 1",
                params![id, dataset_id, sequence_id, blob, content_hash, timestamp],
            )
            .sql_context("save pose result")?;

            tx.query_row(
                &format!("{SELECT_POSE_RESULT} WHERE dataset_id = ?1 AND sequence_id = ?2"),
                params![dataset_id, sequence_id],
                map_pose_result,
            )
            .sql_context("save pose result")
        })?;

        debug!(dataset_id, sequence_id, version = saved.version, "Saved pose result");
        Ok(saved)
    }

    pub fn get_pose_result(
        &self,
        dataset_id: &str,
        sequence_id: &str,
    ) -> Result<Option<PoseAnalysisResult>> {
        self.read("get pose result", |tx| {
            tx.query_row(
                &format!("{SELECT_POSE_RESULT} WHERE dataset_id = ?1 AND sequence_id = ?2"),
                params![dataset_id, sequence_id],
                map_pose_result,
            )
            .optional()
            .sql_context("get pose result")
        })
    }

    /// Whether a result exists, optionally requiring a matching content hash.
    ///
    /// Reads only the hash column; the payload is never decoded.
    pub fn pose_result_exists(
        &self,
        dataset_id: &str,
        sequence_id: &str,
        content_hash: Option<&str>,
    ) -> Result<bool> {
        let stored: Option<String> = self.read("check pose result", |tx| {
            tx.query_row(
                "SELECT content_hash FROM pose_analysis_results WHERE dataset_id = ?1 AND sequence_id = ?2",
                params![dataset_id, sequence_id],
                |row| row.get(0),
            )
            .optional()
            .sql_context("check pose result")
        })?;

        Ok(match (stored, content_hash) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(stored), Some(expected)) => stored == expected,
        })
    }

    pub fn delete_pose_result(&self, dataset_id: &str, sequence_id: &str) -> Result<bool> {
        let deleted = self.write("delete pose result", |tx| {
            tx.execute(
                "DELETE FROM pose_analysis_results WHERE dataset_id = ?1 AND sequence_id = ?2",
                params![dataset_id, sequence_id],
            )
            .sql_context("delete pose result")
        })?;
        Ok(deleted > 0)
    }

    /// Remove every result of a dataset, returning how many rows went.
    pub fn delete_pose_results_for_dataset(&self, dataset_id: &str) -> Result<usize> {
        let deleted = self.write("delete dataset pose results", |tx| {
            tx.execute(
                "DELETE FROM pose_analysis_results WHERE dataset_id = ?1",
                params![dataset_id],
            )
            .sql_context("delete dataset pose results")
        })?;

        info!(dataset_id, deleted, "Deleted pose results for dataset");
        Ok(deleted)
    }

    /// List results newest first.
    pub fn list_pose_results(&self, filter: &PoseResultFilter) -> Result<Vec<PoseAnalysisResult>> {
        self.read("list pose results", |tx| {
            let limit = sql_int(filter.limit);
            let offset = sql_int(filter.offset);
            let rows = match &filter.dataset_id {
                Some(dataset_id) => {
                    let mut stmt = tx
                        .prepare(&format!(
                            "{SELECT_POSE_RESULT} WHERE dataset_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT ?2 OFFSET ?3"
                        ))
                        .sql_context("list pose results")?;
                    let rows = stmt
                        .query_map(params![dataset_id, limit, offset], map_pose_result)
                        .sql_context("list pose results")?;
                    rows.collect::<rusqlite::Result<Vec<_>>>()
                }
                None => {
                    let mut stmt = tx
                        .prepare(&format!(
                            "{SELECT_POSE_RESULT} ORDER BY created_at DESC, rowid DESC LIMIT ?1 OFFSET ?2"
                        ))
                        .sql_context("list pose results")?;
                    let rows = stmt
                        .query_map(params![limit, offset], map_pose_result)
                        .sql_context("list pose results")?;
                    rows.collect::<rusqlite::Result<Vec<_>>>()
                }
            };
            rows.sql_context("list pose results")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_first_save_assigns_composite_id() {
        let store = StructuredStore::open_in_memory().unwrap();
        let saved = store
            .save_pose_result("gavd", "seq_1", &json!({"cadence": 112.0}), "abc")
            .unwrap();
        assert!(saved.id.starts_with("gavd_seq_1_"));
        assert_eq!(saved.version, 1);
        assert_eq!(saved.created_at, saved.updated_at);
    }

    #[test]
    fn test_pairs_with_same_joined_name_get_distinct_rows() {
        let store = StructuredStore::open_in_memory().unwrap();
        for round in 0..20 {
            let left = store
                .save_pose_result("a_b", "c", &json!({"round": round}), "h1")
                .unwrap();
            let right = store
                .save_pose_result("a", "b_c", &json!({"round": round}), "h2")
                .unwrap();
            assert_ne!(left.id, right.id);
        }

        let left = store.get_pose_result("a_b", "c").unwrap().unwrap();
        let right = store.get_pose_result("a", "b_c").unwrap().unwrap();
        assert_eq!(left.version, 20);
        assert_eq!(right.version, 20);
        assert_eq!(left.content_hash, "h1");
        assert_eq!(right.content_hash, "h2");
    }

    #[test]
    fn test_exists_checks_hash_when_given() {
        let store = StructuredStore::open_in_memory().unwrap();
        store
            .save_pose_result("gavd", "seq_1", &json!({}), "hash-a")
            .unwrap();

        assert!(store.pose_result_exists("gavd", "seq_1", None).unwrap());
        assert!(store
            .pose_result_exists("gavd", "seq_1", Some("hash-a"))
            .unwrap());
        assert!(!store
            .pose_result_exists("gavd", "seq_1", Some("hash-b"))
            .unwrap());
        assert!(!store.pose_result_exists("gavd", "seq_2", None).unwrap());
    }

    #[test]
    fn test_delete_dataset_leaves_others() {
        let store = StructuredStore::open_in_memory().unwrap();
        for seq in ["s1", "s2", "s3"] {
            store.save_pose_result("a", seq, &json!({}), "h").unwrap();
        }
        store.save_pose_result("b", "s1", &json!({}), "h").unwrap();

        assert_eq!(store.delete_pose_results_for_dataset("a").unwrap(), 3);
        assert!(store.get_pose_result("b", "s1").unwrap().is_some());
        assert!(!store.delete_pose_result("a", "s1").unwrap());
    }

    #[test]
    fn test_list_filters_and_pages() {
        let store = StructuredStore::open_in_memory().unwrap();
        for seq in ["s1", "s2", "s3"] {
            store.save_pose_result("a", seq, &json!({}), "h").unwrap();
        }
        store.save_pose_result("b", "s1", &json!({}), "h").unwrap();

        let all = store.list_pose_results(&PoseResultFilter::default()).unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].dataset_id, "b");

        let mut page = PoseResultFilter::for_dataset("a");
        page.limit = 2;
        page.offset = 1;
        let sequences: Vec<_> = store
            .list_pose_results(&page)
            .unwrap()
            .into_iter()
            .map(|r| r.sequence_id)
            .collect();
        assert_eq!(sequences, ["s2", "s1"]);
    }
}
