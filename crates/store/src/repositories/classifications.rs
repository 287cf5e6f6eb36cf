use crate::models::{ClassificationResult, NewClassification};
use crate::store::{
    format_timestamp, json_column, timestamp_column, to_json_text, SqlResultExt, StructuredStore,
};
use chrono::Utc;
use gaitstore_core::Result;
use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

fn map_classification(row: &Row<'_>) -> rusqlite::Result<ClassificationResult> {
    Ok(ClassificationResult {
        id: row.get(0)?,
        analysis_id: row.get(1)?,
        is_normal: row.get(2)?,
        confidence: row.get(3)?,
        conditions: json_column(row, 4)?,
        explanation: row.get(5)?,
        feature_importance: json_column(row, 6)?,
        created_at: timestamp_column(row, 7)?,
    })
}

impl StructuredStore {
    /// Store the classification for an analysis, replacing any previous one.
    ///
    /// Fails with `ConstraintViolation` when the analysis does not exist.
    pub fn save_classification(&self, input: &NewClassification) -> Result<ClassificationResult> {
        input.validate()?;

        let result = ClassificationResult {
            id: uuid::Uuid::new_v4().to_string(),
            analysis_id: input.analysis_id.clone(),
            is_normal: input.is_normal,
            confidence: input.confidence,
            conditions: input.conditions.clone(),
            explanation: input.explanation.clone(),
            feature_importance: input.feature_importance.clone(),
            created_at: Utc::now(),
        };
        let conditions = to_json_text(&result.analysis_id, &result.conditions)?;
        let importance = to_json_text(&result.analysis_id, &result.feature_importance)?;

        self.write("save classification", |tx| {
            tx.execute(
                "INSERT INTO classification_results
                    (id, analysis_id, is_normal, confidence, conditions, explanation, feature_importance, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(analysis_id) DO UPDATE SET
                    id = excluded.id,
                    is_normal = excluded.is_normal,
                    confidence = excluded.confidence,
                    conditions = excluded.conditions,
                    explanation = excluded.explanation,
                    feature_importance = excluded.feature_importance,
                    created_at = excluded.created_at",
                params![
                    result.id,
                    result.analysis_id,
                    result.is_normal,
                    result.confidence,
                    conditions,
                    result.explanation,
                    importance,
                    format_timestamp(&result.created_at)
                ],
            )
            .sql_context("save classification")?;
            Ok(())
        })?;

        debug!(analysis_id = %result.analysis_id, is_normal = result.is_normal, "Saved classification");
        Ok(result)
    }

    pub fn get_classification(&self, analysis_id: &str) -> Result<Option<ClassificationResult>> {
        self.read("get classification", |tx| {
            tx.query_row(
                "SELECT id, analysis_id, is_normal, confidence, conditions, explanation, feature_importance, created_at
                 FROM classification_results WHERE analysis_id = ?1",
                params![analysis_id],
                map_classification,
            )
            .optional()
            .sql_context("get classification")
        })
    }
}
