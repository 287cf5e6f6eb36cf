//! Format backends
//!
//! The backend set is fixed, so backends are tagged variants rather than
//! trait objects. Each variant serializes a value under a logical key to a
//! blob rooted at its storage directory and declares the suffixes it owns.

mod binary;
mod json;

pub use binary::BinaryBackend;
pub use json::JsonBackend;

use gaitstore_core::{Error, Result};
use gaitstore_utils::atomic_file::write_atomic;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// A concrete artifact on disk for a logical key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub backend: &'static str,
    pub compressed: bool,
}

#[derive(Debug, Clone)]
pub enum FormatBackend {
    Json(JsonBackend),
    Binary(BinaryBackend),
}

impl FormatBackend {
    pub fn json() -> Self {
        FormatBackend::Json(JsonBackend::default())
    }

    pub fn binary() -> Self {
        FormatBackend::Binary(BinaryBackend::default())
    }

    pub fn name(&self) -> &'static str {
        match self {
            FormatBackend::Json(_) => JsonBackend::NAME,
            FormatBackend::Binary(_) => BinaryBackend::NAME,
        }
    }

    /// Suffix for plain or compressed artifacts
    pub fn extension(&self, compressed: bool) -> &'static str {
        match (self, compressed) {
            (FormatBackend::Json(_), false) => JsonBackend::EXTENSION,
            (FormatBackend::Json(_), true) => JsonBackend::COMPRESSED_EXTENSION,
            (FormatBackend::Binary(_), false) => BinaryBackend::EXTENSION,
            (FormatBackend::Binary(_), true) => BinaryBackend::COMPRESSED_EXTENSION,
        }
    }

    /// Every suffix this backend may write, compressed first
    pub fn supported_extensions(&self) -> [&'static str; 2] {
        [self.extension(true), self.extension(false)]
    }

    pub fn artifact_path(&self, root: &Path, key: &str, compressed: bool) -> PathBuf {
        root.join(format!("{key}{}", self.extension(compressed)))
    }

    /// Find the artifact for `key`; a compressed artifact shadows a plain one
    pub fn locate(&self, root: &Path, key: &str) -> Option<Artifact> {
        [true, false].into_iter().find_map(|compressed| {
            let path = self.artifact_path(root, key, compressed);
            path.is_file().then(|| Artifact {
                path,
                backend: self.name(),
                compressed,
            })
        })
    }

    pub fn exists(&self, root: &Path, key: &str) -> bool {
        self.locate(root, key).is_some()
    }

    /// Serialize `value` and write it atomically, returning the artifact path
    ///
    /// The sibling variant (compressed vs plain) is removed afterwards so a
    /// key never keeps two artifacts in one backend.
    pub fn save<T: Serialize + ?Sized>(
        &self,
        root: &Path,
        key: &str,
        value: &T,
        compressed: bool,
    ) -> Result<PathBuf> {
        let path = self.artifact_path(root, key, compressed);
        let bytes = match self {
            FormatBackend::Json(b) => b.encode(key, value, compressed, &path)?,
            FormatBackend::Binary(b) => b.encode(key, value, compressed, &path)?,
        };
        write_atomic(&path, &bytes)?;

        let sibling = self.artifact_path(root, key, !compressed);
        remove_if_present(&sibling)?;

        Ok(path)
    }

    pub fn load<T: DeserializeOwned>(&self, root: &Path, key: &str) -> Result<T> {
        let artifact = self
            .locate(root, key)
            .ok_or_else(|| Error::not_found("storage key", key))?;
        let bytes = fs::read(&artifact.path)
            .map_err(|e| Error::file_system(&artifact.path, "read artifact", e))?;
        match self {
            FormatBackend::Json(b) => b.decode(key, &bytes, artifact.compressed, &artifact.path),
            FormatBackend::Binary(b) => b.decode(key, &bytes, artifact.compressed, &artifact.path),
        }
    }

    /// Remove both variants of `key`, reporting whether anything was removed
    pub fn delete(&self, root: &Path, key: &str) -> Result<bool> {
        let mut removed = false;
        for compressed in [true, false] {
            removed |= remove_if_present(&self.artifact_path(root, key, compressed))?;
        }
        Ok(removed)
    }
}

/// Remove a file, treating a missing file as success
pub(crate) fn remove_if_present(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::file_system(path, "remove artifact", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct StrideSummary {
        cadence: f64,
        stride_lengths: Vec<f32>,
        side: String,
    }

    fn sample() -> StrideSummary {
        StrideSummary {
            cadence: 112.5,
            stride_lengths: vec![1.21, 1.18, 1.25],
            side: "left".into(),
        }
    }

    #[test]
    fn test_round_trip_every_backend_and_compression() {
        let dir = TempDir::new().unwrap();
        for backend in [FormatBackend::json(), FormatBackend::binary()] {
            for compressed in [false, true] {
                let key = format!("summaries/{}_{compressed}", backend.name());
                let path = backend.save(dir.path(), &key, &sample(), compressed).unwrap();
                assert!(path
                    .to_string_lossy()
                    .ends_with(backend.extension(compressed)));
                let loaded: StrideSummary = backend.load(dir.path(), &key).unwrap();
                assert_eq!(loaded, sample());
            }
        }
    }

    #[test]
    fn test_save_replaces_sibling_variant() {
        let dir = TempDir::new().unwrap();
        let backend = FormatBackend::json();
        backend.save(dir.path(), "k", &sample(), false).unwrap();
        backend.save(dir.path(), "k", &sample(), true).unwrap();

        assert!(!backend.artifact_path(dir.path(), "k", false).exists());
        let artifact = backend.locate(dir.path(), "k").unwrap();
        assert!(artifact.compressed);
    }

    #[test]
    fn test_compressed_artifact_shadows_plain() {
        let dir = TempDir::new().unwrap();
        let backend = FormatBackend::json();
        backend.save(dir.path(), "k", &"compressed", true).unwrap();
        // A plain artifact written behind the manager's back
        fs::write(backend.artifact_path(dir.path(), "k", false), "\"plain\"").unwrap();

        let loaded: String = backend.load(dir.path(), "k").unwrap();
        assert_eq!(loaded, "compressed");
    }

    #[test]
    fn test_binary_rejects_foreign_bytes() {
        let dir = TempDir::new().unwrap();
        let backend = FormatBackend::binary();
        fs::write(backend.artifact_path(dir.path(), "k", false), b"pickle?").unwrap();
        let err = backend.load::<StrideSummary>(dir.path(), "k").unwrap_err();
        assert!(matches!(err, Error::Serialization { .. }));
    }

    #[test]
    fn test_missing_key_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = FormatBackend::binary()
            .load::<StrideSummary>(dir.path(), "absent")
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(!FormatBackend::binary().delete(dir.path(), "absent").unwrap());
    }
}
