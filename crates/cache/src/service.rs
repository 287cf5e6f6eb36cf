//! Analysis front door: serve cached results, compute on miss.

use crate::result_cache::{CacheTier, ResultCache};
use crate::statistics::CacheStatistics;
use gaitstore_core::{PoseFrame, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

/// Supplier of pose sequences, typically the pose estimation pipeline.
pub trait PoseSource {
    /// Frames for a sequence; an empty vector means no pose data is available.
    fn pose_sequence(&self, dataset_id: &str, sequence_id: &str) -> Result<Vec<PoseFrame>>;
}

/// Computes gait analysis results from pose frames.
pub trait GaitAnalyzer {
    fn analyze(&self, dataset_id: &str, sequence_id: &str, frames: &[PoseFrame]) -> Result<Value>;
}

/// Where a returned result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultSource {
    Store,
    File,
    Computed,
}

impl From<CacheTier> for ResultSource {
    fn from(tier: CacheTier) -> Self {
        match tier {
            CacheTier::Store => ResultSource::Store,
            CacheTier::File => ResultSource::File,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    Ready { result: Value, source: ResultSource },
    NoPoseData { dataset_id: String, sequence_id: String },
}

impl AnalysisOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, AnalysisOutcome::Ready { .. })
    }

    /// JSON form handed to callers; missing pose data becomes an error object.
    pub fn to_json(&self) -> Value {
        match self {
            AnalysisOutcome::Ready { result, .. } => result.clone(),
            AnalysisOutcome::NoPoseData {
                dataset_id,
                sequence_id,
            } => json!({
                "error": "no_pose_data",
                "dataset_id": dataset_id,
                "sequence_id": sequence_id,
            }),
        }
    }
}

/// Serves analysis results through the cache and computes them on a miss.
///
/// The cache never computes results itself; computation is delegated to
/// the [`GaitAnalyzer`] with frames from the [`PoseSource`].
pub struct AnalysisService<P, A> {
    cache: ResultCache,
    poses: P,
    analyzer: A,
}

impl<P: PoseSource, A: GaitAnalyzer> AnalysisService<P, A> {
    pub fn new(cache: ResultCache, poses: P, analyzer: A) -> Self {
        Self {
            cache,
            poses,
            analyzer,
        }
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Return the result for a sequence.
    ///
    /// With `use_cache` set, a cached result is returned unless
    /// `force_refresh` is set, and computed results are written through.
    /// Without it the result is computed and nothing is persisted.
    pub fn get_result(
        &self,
        dataset_id: &str,
        sequence_id: &str,
        use_cache: bool,
        force_refresh: bool,
    ) -> Result<AnalysisOutcome> {
        if use_cache && !force_refresh {
            if let Some(hit) = self.cache.get(dataset_id, sequence_id)? {
                return Ok(AnalysisOutcome::Ready {
                    result: hit.result,
                    source: hit.tier.into(),
                });
            }
        }

        let frames = self.poses.pose_sequence(dataset_id, sequence_id)?;
        if frames.is_empty() {
            debug!(dataset_id, sequence_id, "No pose data for sequence");
            return Ok(AnalysisOutcome::NoPoseData {
                dataset_id: dataset_id.to_string(),
                sequence_id: sequence_id.to_string(),
            });
        }

        let result = self.analyzer.analyze(dataset_id, sequence_id, &frames)?;
        if use_cache {
            self.cache.put(dataset_id, sequence_id, &frames, &result)?;
        }
        info!(dataset_id, sequence_id, frames = frames.len(), "Computed analysis result");

        Ok(AnalysisOutcome::Ready {
            result,
            source: ResultSource::Computed,
        })
    }

    pub fn check_exists(&self, dataset_id: &str, sequence_id: &str) -> Result<bool> {
        self.cache.exists(dataset_id, sequence_id)
    }

    pub fn delete(&self, dataset_id: &str, sequence_id: &str) -> Result<bool> {
        self.cache.delete_analysis(dataset_id, sequence_id)
    }

    pub fn clear_cache(&self, dataset_id: Option<&str>, sequence_id: Option<&str>) -> Result<usize> {
        self.cache.clear(dataset_id, sequence_id)
    }

    pub fn statistics(&self) -> Result<CacheStatistics> {
        self.cache.statistics()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_pose_data_renders_error_object() {
        let outcome = AnalysisOutcome::NoPoseData {
            dataset_id: "gavd".to_string(),
            sequence_id: "s9".to_string(),
        };
        assert!(!outcome.is_ready());
        assert_eq!(
            outcome.to_json(),
            json!({"error": "no_pose_data", "dataset_id": "gavd", "sequence_id": "s9"})
        );
    }

    #[test]
    fn test_ready_renders_result() {
        let outcome = AnalysisOutcome::Ready {
            result: json!({"cadence": 110}),
            source: ResultSource::Computed,
        };
        assert_eq!(outcome.to_json(), json!({"cadence": 110}));
    }
}
