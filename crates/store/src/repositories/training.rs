use crate::models::{NewTrainingSample, TrainingDataset, TrainingSample};
use crate::store::{
    format_timestamp, json_column, timestamp_column, to_json_text, SqlResultExt, StructuredStore,
};
use chrono::Utc;
use gaitstore_core::{Error, Result};
use rusqlite::{params, OptionalExtension, Row};
use serde_json::{Map, Value};
use tracing::info;

const SELECT_SAMPLE: &str =
    "SELECT id, dataset_id, features, label, metadata, created_at FROM training_samples";

fn map_dataset(row: &Row<'_>) -> rusqlite::Result<TrainingDataset> {
    Ok(TrainingDataset {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        metadata: json_column(row, 3)?,
        created_at: timestamp_column(row, 4)?,
    })
}

fn map_sample(row: &Row<'_>) -> rusqlite::Result<TrainingSample> {
    Ok(TrainingSample {
        id: row.get(0)?,
        dataset_id: row.get(1)?,
        features: json_column(row, 2)?,
        label: row.get(3)?,
        metadata: json_column(row, 4)?,
        created_at: timestamp_column(row, 5)?,
    })
}

impl StructuredStore {
    /// Create a dataset. Names are unique; a duplicate fails with `ConstraintViolation`.
    pub fn create_training_dataset(
        &self,
        name: &str,
        description: Option<&str>,
        metadata: Map<String, Value>,
    ) -> Result<TrainingDataset> {
        if name.trim().is_empty() {
            return Err(Error::configuration("dataset name must not be empty"));
        }

        let dataset = TrainingDataset {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            description: description.map(str::to_string),
            metadata,
            created_at: Utc::now(),
        };
        let metadata_text = to_json_text(&dataset.name, &dataset.metadata)?;

        self.write("create training dataset", |tx| {
            tx.execute(
                "INSERT INTO training_datasets (id, name, description, metadata, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    dataset.id,
                    dataset.name,
                    dataset.description,
                    metadata_text,
                    format_timestamp(&dataset.created_at)
                ],
            )
            .sql_context("create training dataset")?;
            Ok(())
        })?;

        info!(id = %dataset.id, name = %dataset.name, "Created training dataset");
        Ok(dataset)
    }

    pub fn get_training_dataset(&self, id: &str) -> Result<Option<TrainingDataset>> {
        self.read("get training dataset", |tx| {
            tx.query_row(
                "SELECT id, name, description, metadata, created_at FROM training_datasets WHERE id = ?1",
                params![id],
                map_dataset,
            )
            .optional()
            .sql_context("get training dataset")
        })
    }

    pub fn list_training_datasets(&self) -> Result<Vec<TrainingDataset>> {
        self.read("list training datasets", |tx| {
            let mut stmt = tx
                .prepare(
                    "SELECT id, name, description, metadata, created_at FROM training_datasets ORDER BY name",
                )
                .sql_context("list training datasets")?;
            let rows = stmt
                .query_map([], map_dataset)
                .sql_context("list training datasets")?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .sql_context("list training datasets")
        })
    }

    /// Append samples to a dataset in one transaction; either all rows land or none do.
    pub fn add_training_samples(
        &self,
        dataset_id: &str,
        samples: &[NewTrainingSample],
    ) -> Result<Vec<TrainingSample>> {
        if let Some(bad) = samples.iter().find(|s| s.features.is_empty()) {
            return Err(Error::configuration(format!(
                "training sample labeled '{}' has no features",
                bad.label
            )));
        }

        let now = Utc::now();
        let created_at = format_timestamp(&now);
        let mut stored = Vec::with_capacity(samples.len());

        self.write("add training samples", |tx| {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO training_samples (id, dataset_id, features, label, metadata, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )
                .sql_context("add training samples")?;

            for sample in samples {
                let id = uuid::Uuid::new_v4().to_string();
                stmt.execute(params![
                    id,
                    dataset_id,
                    to_json_text(&id, &sample.features)?,
                    sample.label,
                    to_json_text(&id, &sample.metadata)?,
                    created_at
                ])
                .sql_context("add training samples")?;

                stored.push(TrainingSample {
                    id,
                    dataset_id: dataset_id.to_string(),
                    features: sample.features.clone(),
                    label: sample.label.clone(),
                    metadata: sample.metadata.clone(),
                    created_at: now,
                });
            }
            Ok(())
        })?;

        info!(dataset_id, count = stored.len(), "Added training samples");
        Ok(stored)
    }

    /// Samples of one dataset in insertion order.
    pub fn get_training_samples(&self, dataset_id: &str) -> Result<Vec<TrainingSample>> {
        self.read("get training samples", |tx| {
            let mut stmt = tx
                .prepare(&format!(
                    "{SELECT_SAMPLE} WHERE dataset_id = ?1 ORDER BY created_at, rowid"
                ))
                .sql_context("get training samples")?;
            let rows = stmt
                .query_map(params![dataset_id], map_sample)
                .sql_context("get training samples")?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .sql_context("get training samples")
        })
    }

    /// Samples with the given label across every dataset.
    pub fn get_training_samples_by_condition(&self, label: &str) -> Result<Vec<TrainingSample>> {
        self.read("get training samples by condition", |tx| {
            let mut stmt = tx
                .prepare(&format!(
                    "{SELECT_SAMPLE} WHERE label = ?1 ORDER BY created_at, rowid"
                ))
                .sql_context("get training samples by condition")?;
            let rows = stmt
                .query_map(params![label], map_sample)
                .sql_context("get training samples by condition")?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .sql_context("get training samples by condition")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_dataset_name_is_constraint_violation() {
        let store = StructuredStore::open_in_memory().unwrap();
        store
            .create_training_dataset("gavd", Some("clinical walks"), Map::new())
            .unwrap();
        let err = store
            .create_training_dataset("gavd", None, Map::new())
            .unwrap_err();
        assert!(matches!(err, Error::ConstraintViolation { .. }), "{err}");
    }

    #[test]
    fn test_samples_for_unknown_dataset_are_all_rejected() {
        let store = StructuredStore::open_in_memory().unwrap();
        let samples = vec![
            NewTrainingSample::new(vec![0.1, 0.2], "normal"),
            NewTrainingSample::new(vec![0.3, 0.4], "parkinsonian"),
        ];
        let err = store.add_training_samples("ghost", &samples).unwrap_err();
        assert!(matches!(err, Error::ConstraintViolation { .. }));
        assert!(store.get_training_samples("ghost").unwrap().is_empty());
    }

    #[test]
    fn test_empty_feature_vector_is_rejected() {
        let store = StructuredStore::open_in_memory().unwrap();
        let dataset = store.create_training_dataset("d", None, Map::new()).unwrap();
        let err = store
            .add_training_samples(&dataset.id, &[NewTrainingSample::new(vec![], "normal")])
            .unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_datasets_listed_by_name() {
        let store = StructuredStore::open_in_memory().unwrap();
        store.create_training_dataset("zeta", None, Map::new()).unwrap();
        store.create_training_dataset("alpha", None, Map::new()).unwrap();
        let names: Vec<_> = store
            .list_training_datasets()
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, ["alpha", "zeta"]);
    }
}
