//! Storage manager: logical keys to backend-chosen artifacts

use crate::backend::{remove_if_present, Artifact, FormatBackend};
use crate::metadata::{is_sidecar, sidecar_path, StorageMetadata};
use chrono::Utc;
use gaitstore_config::GaitStoreConfig;
use gaitstore_core::{Error, Result, BINARY_BACKEND, RESERVED_KEY_SUFFIX, TEMP_FILE_PREFIX};
use gaitstore_utils::atomic_file::{is_temp_file, write_atomic_json};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

/// Per-call save options
#[derive(Debug, Clone, Default)]
pub struct SaveOptions {
    /// Backend name; detected from disk or defaulted when absent
    pub backend: Option<String>,
    /// Override the manager's compression default
    pub compress: Option<bool>,
    /// Caller metadata recorded in the sidecar
    pub metadata: Option<Map<String, Value>>,
}

impl SaveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn backend(mut self, name: impl Into<String>) -> Self {
        self.backend = Some(name.into());
        self
    }

    pub fn compress(mut self, compress: bool) -> Self {
        self.compress = Some(compress);
        self
    }

    pub fn metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Maps logical keys to artifacts across the registered backends
#[derive(Debug, Clone)]
pub struct StorageManager {
    root: PathBuf,
    /// Registration order is probing order
    backends: IndexMap<&'static str, FormatBackend>,
    default_backend: &'static str,
    compress: bool,
    write_metadata: bool,
}

impl StorageManager {
    /// Create a manager rooted at `root` with both backends registered
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .map_err(|e| Error::file_system(&root, "create storage root", e))?;

        let mut backends = IndexMap::new();
        for backend in [FormatBackend::json(), FormatBackend::binary()] {
            backends.insert(backend.name(), backend);
        }

        Ok(Self {
            root,
            backends,
            default_backend: BINARY_BACKEND,
            compress: false,
            write_metadata: true,
        })
    }

    /// Create a manager from the `storage` section of the configuration
    pub fn from_config(config: &GaitStoreConfig) -> Result<Self> {
        Self::new(config.storage_root())?
            .with_default_backend(&config.storage.default_backend)
            .map(|m| {
                m.with_compression(config.storage.compress)
                    .with_metadata_sidecars(config.storage.write_metadata)
            })
    }

    /// Backend used when nothing exists on disk and no hint is given
    pub fn with_default_backend(mut self, name: &str) -> Result<Self> {
        self.default_backend = self.backend(name)?.name();
        Ok(self)
    }

    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn with_metadata_sidecars(mut self, enabled: bool) -> Self {
        self.write_metadata = enabled;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn registered_backends(&self) -> Vec<&'static str> {
        self.backends.keys().copied().collect()
    }

    /// Look up a backend by name
    pub fn backend(&self, name: &str) -> Result<&FormatBackend> {
        self.backends
            .get(name)
            .ok_or_else(|| Error::unknown_backend(name, &self.registered_backends()))
    }

    /// Probe every backend's suffixes for an existing artifact
    pub fn locate(&self, key: &str) -> Result<Option<Artifact>> {
        validate_key(key)?;
        Ok(self
            .backends
            .values()
            .find_map(|backend| backend.locate(&self.root, key)))
    }

    /// Resolve the backend for `key`: explicit hint, then detection, then default
    pub fn resolve_backend(&self, key: &str, hint: Option<&str>) -> Result<&FormatBackend> {
        if let Some(name) = hint {
            return self.backend(name);
        }
        match self.locate(key)? {
            Some(artifact) => self.backend(artifact.backend),
            None => self.backend(self.default_backend),
        }
    }

    /// Serialize and store `value` under `key`, returning the artifact path
    pub fn save<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        options: SaveOptions,
    ) -> Result<PathBuf> {
        let backend = self.resolve_backend(key, options.backend.as_deref())?;
        let compressed = options.compress.unwrap_or(self.compress);
        let path = backend.save(&self.root, key, value, compressed)?;

        // One artifact per key: drop copies another backend may hold
        for other in self.backends.values().filter(|b| b.name() != backend.name()) {
            if other.delete(&self.root, key)? {
                tracing::debug!(key, backend = other.name(), "Removed artifact superseded by new backend");
            }
        }

        if self.write_metadata || options.metadata.is_some() {
            let size_bytes = fs::metadata(&path).map(|m| m.len()).unwrap_or_default();
            let sidecar = StorageMetadata {
                key: key.to_string(),
                backend_name: backend.name().to_string(),
                compressed,
                saved_at: Utc::now(),
                size_bytes,
                metadata: options.metadata.unwrap_or_default(),
            };
            write_atomic_json(&sidecar_path(&self.root, key), &sidecar)?;
        } else if remove_if_present(&sidecar_path(&self.root, key))? {
            tracing::debug!(key, "Removed sidecar from an earlier save");
        }

        tracing::debug!(key, backend = backend.name(), compressed, "Saved artifact");
        Ok(path)
    }

    /// Load the value stored under `key` from whichever backend holds it
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let artifact = self
            .locate(key)?
            .ok_or_else(|| Error::not_found("storage key", key))?;
        self.backend(artifact.backend)?.load(&self.root, key)
    }

    /// Load `key` through an explicit backend
    pub fn load_with<T: DeserializeOwned>(&self, key: &str, backend: &str) -> Result<T> {
        validate_key(key)?;
        self.backend(backend)?.load(&self.root, key)
    }

    pub fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.locate(key)?.is_some())
    }

    /// Remove every artifact and the sidecar for `key`
    ///
    /// Returns `false` when nothing existed. When some files were removed
    /// and others could not be, a `PartialDelete` error is returned.
    pub fn delete(&self, key: &str) -> Result<bool> {
        validate_key(key)?;
        let mut removed = false;
        let mut failures = Vec::new();

        for backend in self.backends.values() {
            match backend.delete(&self.root, key) {
                Ok(hit) => removed |= hit,
                Err(e) => failures.push(e),
            }
        }
        match remove_if_present(&sidecar_path(&self.root, key)) {
            Ok(hit) => removed |= hit,
            Err(e) => failures.push(e),
        }

        match (removed, failures.len()) {
            (_, 0) => {
                if removed {
                    tracing::debug!(key, "Deleted artifact");
                }
                Ok(removed)
            }
            (true, _) => Err(Error::partial_delete(
                key,
                failures
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; "),
            )),
            (false, _) => Err(failures.remove(0)),
        }
    }

    /// Sidecar for `key`, if one was written
    pub fn metadata(&self, key: &str) -> Result<Option<StorageMetadata>> {
        validate_key(key)?;
        let path = sidecar_path(&self.root, key);
        match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| Error::serialization(key, "decode metadata sidecar", e)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::file_system(path, "read metadata sidecar", e)),
        }
    }

    /// Last modification time of the artifact holding `key`
    pub fn modified(&self, key: &str) -> Result<Option<SystemTime>> {
        let Some(artifact) = self.locate(key)? else {
            return Ok(None);
        };
        fs::metadata(&artifact.path)
            .and_then(|m| m.modified())
            .map(Some)
            .map_err(|e| Error::file_system(&artifact.path, "read artifact mtime", e))
    }

    /// Logical keys under the root, optionally restricted to a prefix
    ///
    /// Known suffixes are stripped, sidecars and in-flight temp files are
    /// skipped, and the result is sorted and deduplicated.
    pub fn list_keys(&self, prefix: Option<&str>) -> Result<Vec<String>> {
        let mut suffixes: Vec<&'static str> = self
            .backends
            .values()
            .flat_map(|b| b.supported_extensions())
            .collect();
        // Longest first so ".json.gz" is stripped before ".json"
        suffixes.sort_by_key(|s| std::cmp::Reverse(s.len()));

        let mut keys = BTreeSet::new();
        for entry in WalkDir::new(&self.root).follow_links(false) {
            let entry = entry.map_err(|e| {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| self.root.clone());
                Error::file_system(path, "walk storage root", e.into())
            })?;
            let path = entry.path();
            if !entry.file_type().is_file() || is_sidecar(path) || is_temp_file(path) {
                continue;
            }
            let Ok(relative) = path.strip_prefix(&self.root) else {
                continue;
            };
            let relative = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let Some(key) = suffixes
                .iter()
                .find_map(|suffix| relative.strip_suffix(suffix))
            else {
                continue;
            };
            if prefix.map_or(true, |p| key.starts_with(p)) {
                keys.insert(key.to_string());
            }
        }

        Ok(keys.into_iter().collect())
    }
}

/// Reject keys that would escape the root or collide with internal files
fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::configuration("storage key must not be empty"));
    }
    if key.starts_with('/') || key.contains('\\') {
        return Err(Error::configuration(format!(
            "storage key '{key}' must be a relative '/'-separated path"
        )));
    }
    for segment in key.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(Error::configuration(format!(
                "storage key '{key}' contains an invalid segment"
            )));
        }
        if segment.starts_with(TEMP_FILE_PREFIX) {
            return Err(Error::configuration(format!(
                "storage key '{key}' uses the reserved prefix {TEMP_FILE_PREFIX}"
            )));
        }
    }
    if key.ends_with(RESERVED_KEY_SUFFIX) {
        return Err(Error::configuration(format!(
            "storage key '{key}' must not end with {RESERVED_KEY_SUFFIX}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("pose_results/gavd/seq_1").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("/etc/passwd").is_err());
        assert!(validate_key("a/../b").is_err());
        assert!(validate_key("a//b").is_err());
        assert!(validate_key(".tmp-123").is_err());
        assert!(validate_key("a.meta").is_err());
        assert!(validate_key("a.meta/b").is_ok());
    }

    #[test]
    fn test_unknown_backend_hint() {
        let dir = TempDir::new().unwrap();
        let manager = StorageManager::new(dir.path()).unwrap();
        let err = manager
            .save("k", &1u32, SaveOptions::new().backend("pickle"))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownBackend { .. }));
    }

    #[test]
    fn test_default_backend_is_binary() {
        let dir = TempDir::new().unwrap();
        let manager = StorageManager::new(dir.path()).unwrap();
        let path = manager.save("weights", &vec![1u8, 2, 3], SaveOptions::new()).unwrap();
        assert!(path.to_string_lossy().ends_with(".bin"));
    }

    #[test]
    fn test_detect_before_create_reuses_existing_backend() {
        let dir = TempDir::new().unwrap();
        let manager = StorageManager::new(dir.path()).unwrap();
        manager
            .save("report", &"v1", SaveOptions::new().backend("json"))
            .unwrap();
        let path = manager.save("report", &"v2", SaveOptions::new()).unwrap();

        assert!(path.to_string_lossy().ends_with(".json"));
        assert_eq!(manager.load::<String>("report").unwrap(), "v2");
    }

    #[test]
    fn test_switching_backend_removes_old_artifact() {
        let dir = TempDir::new().unwrap();
        let manager = StorageManager::new(dir.path()).unwrap();
        manager
            .save("report", &"v1", SaveOptions::new().backend("json"))
            .unwrap();
        manager
            .save("report", &"v2".to_string(), SaveOptions::new().backend("binary"))
            .unwrap();

        assert!(!dir.path().join("report.json").exists());
        let artifact = manager.locate("report").unwrap().unwrap();
        assert_eq!(artifact.backend, "binary");
    }
}
