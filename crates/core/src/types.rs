use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::RESERVED_KEY_SUFFIX;
use crate::errors::{Error, Result};

/// A single detected body landmark in one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub confidence: f64,
}

/// Pose observations for one video frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseFrame {
    pub frame_number: u64,
    pub keypoints: Vec<Keypoint>,
}

impl PoseFrame {
    /// Create a frame from its number and keypoints
    #[must_use]
    pub fn new(frame_number: u64, keypoints: Vec<Keypoint>) -> Self {
        Self {
            frame_number,
            keypoints,
        }
    }
}

/// Natural key of a per-sequence analysis result
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SequenceKey {
    pub dataset_id: String,
    pub sequence_id: String,
}

impl SequenceKey {
    /// Build a key, rejecting empty identifiers and path separators
    pub fn new(dataset_id: impl Into<String>, sequence_id: impl Into<String>) -> Result<Self> {
        let key = Self {
            dataset_id: dataset_id.into(),
            sequence_id: sequence_id.into(),
        };
        validate_identifier("dataset_id", &key.dataset_id)?;
        validate_identifier("sequence_id", &key.sequence_id)?;
        if key.sequence_id.ends_with(RESERVED_KEY_SUFFIX) {
            return Err(Error::configuration(format!(
                "sequence_id '{}' must not end with {RESERVED_KEY_SUFFIX}",
                key.sequence_id
            )));
        }
        Ok(key)
    }
}

impl fmt::Display for SequenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.dataset_id, self.sequence_id)
    }
}

fn validate_identifier(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::configuration(format!("{field} must not be empty")));
    }
    if value == "." || value == ".." || value.contains(['/', '\\']) {
        return Err(Error::configuration(format!(
            "{field} '{value}' must not contain path separators"
        )));
    }
    Ok(())
}
