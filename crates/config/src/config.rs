//! Configuration types and builder

use gaitstore_core::{
    Error, Result, BACKUPS_DIRNAME, BINARY_BACKEND, DATABASE_FILENAME, DEFAULT_CACHE_TTL_DAYS,
    DEFAULT_RETENTION_DAYS, KNOWN_BACKENDS, SECONDS_PER_DAY, STORAGE_DIRNAME,
};
use gaitstore_utils::xdg::XdgPaths;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Complete gaitstore configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaitStoreConfig {
    /// Root directory for the database, blob storage and backups
    pub data_dir: PathBuf,
    pub storage: StorageSettings,
    pub store: StoreSettings,
    pub cache: CacheSettings,
    pub backup: BackupSettings,
    /// Where the effective values came from
    #[serde(skip)]
    pub source: ConfigSource,
}

/// Flat-file storage settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Blob root, defaults to `<data_dir>/storage`
    pub root: Option<PathBuf>,
    /// Backend used when a key has no artifact on disk and no hint is given
    pub default_backend: String,
    /// Compress new artifacts
    pub compress: bool,
    /// Write a `.meta.json` sidecar next to every artifact
    pub write_metadata: bool,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            root: None,
            default_backend: BINARY_BACKEND.to_string(),
            compress: false,
            write_metadata: true,
        }
    }
}

/// Structured store settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Database file, defaults to `<data_dir>/gaitstore.db`
    pub database_path: Option<PathBuf>,
}

/// Result cache settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// File-tier entries older than this are treated as misses
    pub ttl_days: u64,
    /// Disable to run with the structured store only
    pub file_cache_enabled: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_days: DEFAULT_CACHE_TTL_DAYS,
            file_cache_enabled: true,
        }
    }
}

/// Backup manager settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupSettings {
    /// Backup root, defaults to `<data_dir>/backups`
    pub root: Option<PathBuf>,
    pub retention_days: u32,
    pub compress: bool,
    pub verify: bool,
    /// Directories or files captured by `backup create` when none are given
    pub sources: Vec<PathBuf>,
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            root: None,
            retention_days: DEFAULT_RETENTION_DAYS,
            compress: true,
            verify: true,
            sources: Vec::new(),
        }
    }
}

/// Source of configuration for debugging and precedence tracking
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default configuration
    #[default]
    Default,
    /// Configuration file
    ConfigFile(PathBuf),
    /// Environment variable
    EnvironmentVariable(String),
    /// Command line argument
    CommandLine,
}

impl Default for GaitStoreConfig {
    fn default() -> Self {
        Self {
            data_dir: XdgPaths::data_dir(),
            storage: StorageSettings::default(),
            store: StoreSettings::default(),
            cache: CacheSettings::default(),
            backup: BackupSettings::default(),
            source: ConfigSource::Default,
        }
    }
}

impl GaitStoreConfig {
    /// Configuration rooted at `data_dir` with every other value defaulted
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    pub fn storage_root(&self) -> PathBuf {
        self.storage
            .root
            .clone()
            .unwrap_or_else(|| self.data_dir.join(STORAGE_DIRNAME))
    }

    pub fn database_path(&self) -> PathBuf {
        self.store
            .database_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join(DATABASE_FILENAME))
    }

    pub fn backup_root(&self) -> PathBuf {
        self.backup
            .root
            .clone()
            .unwrap_or_else(|| self.data_dir.join(BACKUPS_DIRNAME))
    }

    /// File-tier time-to-live
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_days.saturating_mul(SECONDS_PER_DAY))
    }

    /// Sources captured by default: the database file and the blob root
    pub fn backup_sources(&self) -> Vec<PathBuf> {
        if self.backup.sources.is_empty() {
            vec![self.database_path(), self.storage_root()]
        } else {
            self.backup.sources.clone()
        }
    }

    /// Reject values that would make the subsystem misbehave
    pub fn validate(&self) -> Result<()> {
        if self.cache.ttl_days == 0 {
            return Err(Error::configuration("cache.ttl_days must be at least 1"));
        }
        if self.cache.ttl_days.checked_mul(SECONDS_PER_DAY).is_none() {
            return Err(Error::configuration(format!(
                "cache.ttl_days {} is too large",
                self.cache.ttl_days
            )));
        }
        if !KNOWN_BACKENDS.contains(&self.storage.default_backend.as_str()) {
            return Err(Error::unknown_backend(
                self.storage.default_backend.clone(),
                KNOWN_BACKENDS,
            ));
        }
        if self.data_dir.as_os_str().is_empty() {
            return Err(Error::configuration("data_dir must not be empty"));
        }
        Ok(())
    }
}

/// Builder for creating configurations programmatically
pub struct ConfigBuilder {
    config: GaitStoreConfig,
}

impl ConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: GaitStoreConfig::default(),
        }
    }

    pub fn data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.config.data_dir = data_dir.into();
        self
    }

    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.store.database_path = Some(path.into());
        self
    }

    pub fn storage_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.storage.root = Some(path.into());
        self
    }

    pub fn default_backend(mut self, backend: impl Into<String>) -> Self {
        self.config.storage.default_backend = backend.into();
        self
    }

    pub fn compress_storage(mut self, compress: bool) -> Self {
        self.config.storage.compress = compress;
        self
    }

    pub fn cache_ttl_days(mut self, days: u64) -> Self {
        self.config.cache.ttl_days = days;
        self
    }

    pub fn file_cache_enabled(mut self, enabled: bool) -> Self {
        self.config.cache.file_cache_enabled = enabled;
        self
    }

    pub fn backup_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.backup.root = Some(path.into());
        self
    }

    pub fn retention_days(mut self, days: u32) -> Self {
        self.config.backup.retention_days = days;
        self
    }

    pub fn source(mut self, source: ConfigSource) -> Self {
        self.config.source = source;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<GaitStoreConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_derive_from_data_dir() {
        let config = GaitStoreConfig::with_data_dir("/srv/gait");
        assert_eq!(config.storage_root(), PathBuf::from("/srv/gait/storage"));
        assert_eq!(config.database_path(), PathBuf::from("/srv/gait/gaitstore.db"));
        assert_eq!(config.backup_root(), PathBuf::from("/srv/gait/backups"));
        assert_eq!(config.cache_ttl(), Duration::from_secs(7 * 24 * 60 * 60));
    }

    #[test]
    fn test_explicit_paths_win() {
        let config = ConfigBuilder::new()
            .data_dir("/srv/gait")
            .database_path("/fast/gait.db")
            .backup_root("/mnt/backups")
            .build()
            .unwrap();
        assert_eq!(config.database_path(), PathBuf::from("/fast/gait.db"));
        assert_eq!(config.backup_root(), PathBuf::from("/mnt/backups"));
        assert_eq!(
            config.backup_sources(),
            vec![PathBuf::from("/fast/gait.db"), PathBuf::from("/srv/gait/storage")]
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(ConfigBuilder::new().cache_ttl_days(0).build().is_err());
        assert!(ConfigBuilder::new()
            .cache_ttl_days(u64::MAX / 1000)
            .build()
            .is_err());
        let err = ConfigBuilder::new().default_backend("yaml").build().unwrap_err();
        assert!(matches!(err, Error::UnknownBackend { .. }));
    }

    #[test]
    fn test_oversized_ttl_saturates_without_validation() {
        let mut config = GaitStoreConfig::with_data_dir("/srv/gait");
        config.cache.ttl_days = u64::MAX / 1000;
        assert_eq!(config.cache_ttl(), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: GaitStoreConfig =
            serde_json::from_str(r#"{"data_dir": "/data", "cache": {"ttl_days": 3}}"#).unwrap();
        assert_eq!(config.cache.ttl_days, 3);
        assert!(config.cache.file_cache_enabled);
        assert_eq!(config.backup.retention_days, DEFAULT_RETENTION_DAYS);
        assert_eq!(config.storage.default_backend, BINARY_BACKEND);
    }
}
