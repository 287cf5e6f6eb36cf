//! Relational persistence for gait analyses.
//!
//! [`StructuredStore`] keeps five tables in one SQLite database: analyses,
//! their classifications, training datasets with their samples, and the
//! pose analysis results that back the durable tier of the result cache.

pub mod models;
mod repositories;
pub mod schema;
mod store;

pub use models::{
    AnalysisFilter, AnalysisRecord, AnalysisStatus, ClassificationResult, NewClassification,
    NewTrainingSample, PoseAnalysisResult, PoseResultFilter, StoreStatistics, TrainingDataset,
    TrainingSample, DEFAULT_LIST_LIMIT,
};
pub use store::StructuredStore;
