//! Record types persisted by the structured store.

use chrono::{DateTime, Utc};
use gaitstore_core::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Default page size for list queries
pub const DEFAULT_LIST_LIMIT: usize = 100;

/// Processing state of a video analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl AnalysisStatus {
    pub const ALL: [AnalysisStatus; 4] = [
        AnalysisStatus::Pending,
        AnalysisStatus::Processing,
        AnalysisStatus::Completed,
        AnalysisStatus::Failed,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Pending => "pending",
            AnalysisStatus::Processing => "processing",
            AnalysisStatus::Completed => "completed",
            AnalysisStatus::Failed => "failed",
        }
    }

    /// Whether no further processing is expected
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, AnalysisStatus::Completed | AnalysisStatus::Failed)
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(AnalysisStatus::Pending),
            "processing" => Ok(AnalysisStatus::Processing),
            "completed" => Ok(AnalysisStatus::Completed),
            "failed" => Ok(AnalysisStatus::Failed),
            other => Err(Error::configuration(format!(
                "unknown analysis status '{other}'"
            ))),
        }
    }
}

/// One submitted video analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: String,
    pub video_path: String,
    pub status: AnalysisStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub metadata: Map<String, Value>,
    pub error_message: Option<String>,
}

/// Filter for [`crate::StructuredStore::list_analyses`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisFilter {
    pub status: Option<AnalysisStatus>,
    pub limit: usize,
    pub offset: usize,
}

impl Default for AnalysisFilter {
    fn default() -> Self {
        Self {
            status: None,
            limit: DEFAULT_LIST_LIMIT,
            offset: 0,
        }
    }
}

impl AnalysisFilter {
    #[must_use]
    pub fn with_status(status: AnalysisStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }
}

/// Classifier verdict for an analysis, at most one per analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub id: String,
    pub analysis_id: String,
    pub is_normal: bool,
    pub confidence: f64,
    pub conditions: Vec<String>,
    pub explanation: String,
    pub feature_importance: BTreeMap<String, f64>,
    pub created_at: DateTime<Utc>,
}

/// Input for [`crate::StructuredStore::save_classification`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewClassification {
    pub analysis_id: String,
    pub is_normal: bool,
    pub confidence: f64,
    pub conditions: Vec<String>,
    pub explanation: String,
    pub feature_importance: BTreeMap<String, f64>,
}

impl NewClassification {
    pub fn new(analysis_id: impl Into<String>, is_normal: bool, confidence: f64) -> Self {
        Self {
            analysis_id: analysis_id.into(),
            is_normal,
            confidence,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_conditions<I, S>(mut self, conditions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.conditions = conditions.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = explanation.into();
        self
    }

    #[must_use]
    pub fn with_feature(mut self, name: impl Into<String>, importance: f64) -> Self {
        self.feature_importance.insert(name.into(), importance);
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(Error::configuration(format!(
                "classification confidence {} is outside [0, 1]",
                self.confidence
            )));
        }
        Ok(())
    }
}

/// Named corpus of labeled feature vectors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingDataset {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub metadata: Map<String, Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSample {
    pub id: String,
    pub dataset_id: String,
    pub features: Vec<f64>,
    pub label: String,
    pub metadata: Map<String, Value>,
    pub created_at: DateTime<Utc>,
}

/// Input for [`crate::StructuredStore::add_training_samples`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewTrainingSample {
    pub features: Vec<f64>,
    pub label: String,
    pub metadata: Map<String, Value>,
}

impl NewTrainingSample {
    pub fn new(features: Vec<f64>, label: impl Into<String>) -> Self {
        Self {
            features,
            label: label.into(),
            metadata: Map::new(),
        }
    }
}

/// Durable analysis output for one pose sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseAnalysisResult {
    pub id: String,
    pub dataset_id: String,
    pub sequence_id: String,
    pub analysis: Value,
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i64,
}

/// Filter for [`crate::StructuredStore::list_pose_results`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoseResultFilter {
    pub dataset_id: Option<String>,
    pub limit: usize,
    pub offset: usize,
}

impl Default for PoseResultFilter {
    fn default() -> Self {
        Self {
            dataset_id: None,
            limit: DEFAULT_LIST_LIMIT,
            offset: 0,
        }
    }
}

impl PoseResultFilter {
    pub fn for_dataset(dataset_id: impl Into<String>) -> Self {
        Self {
            dataset_id: Some(dataset_id.into()),
            ..Self::default()
        }
    }
}

/// Row counts and size of the database
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreStatistics {
    pub analyses_by_status: BTreeMap<String, u64>,
    pub classifications: u64,
    pub training_datasets: u64,
    pub training_samples: u64,
    pub pose_results: u64,
    pub database_size_bytes: u64,
}

impl StoreStatistics {
    #[must_use]
    pub fn total_analyses(&self) -> u64 {
        self.analyses_by_status.values().sum()
    }
}
