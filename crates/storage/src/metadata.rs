//! Metadata sidecars stored next to each artifact

use chrono::{DateTime, Utc};
use gaitstore_core::METADATA_SUFFIX;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Sidecar describing one stored blob
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageMetadata {
    pub key: String,
    pub backend_name: String,
    pub compressed: bool,
    pub saved_at: DateTime<Utc>,
    pub size_bytes: u64,
    /// Caller-supplied metadata
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Sidecar path for a logical key
pub fn sidecar_path(root: &Path, key: &str) -> PathBuf {
    root.join(format!("{key}{METADATA_SUFFIX}"))
}

/// Whether a path is a sidecar rather than data
pub fn is_sidecar(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(METADATA_SUFFIX))
}
