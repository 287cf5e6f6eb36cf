//! Configuration loader with precedence handling
//!
//! Precedence, lowest to highest: built-in defaults, the JSON config file,
//! `GAITSTORE_*` environment variables, explicit command line overrides.

use crate::config::{ConfigSource, GaitStoreConfig};
use gaitstore_core::{
    Error, Result, GAITSTORE_BACKUP_DIR_VAR, GAITSTORE_BACKUP_RETENTION_DAYS_VAR,
    GAITSTORE_CACHE_TTL_DAYS_VAR, GAITSTORE_DATABASE_VAR, GAITSTORE_DATA_DIR_VAR,
    GAITSTORE_DEFAULT_BACKEND_VAR,
};
use gaitstore_utils::xdg::XdgPaths;
use std::path::{Path, PathBuf};

/// Configuration loader that handles all startup configuration
#[derive(Debug, Default)]
pub struct ConfigLoader {
    /// Explicit config file, defaults to `$XDG_CONFIG_HOME/gaitstore/config.json`
    config_file: Option<PathBuf>,
    /// Command line data directory override
    data_dir: Option<PathBuf>,
    /// Skip environment variables (used by tests and embedders)
    ignore_env: bool,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from this file instead of the XDG location
    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Override the data directory after every other source
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(path.into());
        self
    }

    /// Do not consult `GAITSTORE_*` environment variables
    pub fn ignore_env(mut self, ignore: bool) -> Self {
        self.ignore_env = ignore;
        self
    }

    /// Load the configuration
    pub fn load(self) -> Result<GaitStoreConfig> {
        let explicit_file = self.config_file.is_some();
        let config_path = self.config_file.unwrap_or_else(XdgPaths::config_file);

        let mut config = match Self::load_from_config_file(&config_path)? {
            Some(file_config) => file_config,
            None if explicit_file => {
                return Err(Error::not_found("config file", config_path.display().to_string()));
            }
            None => GaitStoreConfig::default(),
        };

        if !self.ignore_env {
            Self::apply_env(&mut config);
        }

        if let Some(data_dir) = self.data_dir {
            config.data_dir = data_dir;
            config.source = ConfigSource::CommandLine;
        }

        config.validate()?;
        tracing::debug!(source = ?config.source, data_dir = %config.data_dir.display(), "Loaded configuration");
        Ok(config)
    }

    /// Load configuration from a JSON file, `None` when it does not exist
    fn load_from_config_file(path: &Path) -> Result<Option<GaitStoreConfig>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::file_system(path, "read config file", e))?;

        let mut config: GaitStoreConfig = serde_json::from_str(&content)
            .map_err(|e| Error::serialization(path.display().to_string(), "parse config file", e))?;
        config.source = ConfigSource::ConfigFile(path.to_path_buf());
        Ok(Some(config))
    }

    /// Override values from `GAITSTORE_*` environment variables
    fn apply_env(config: &mut GaitStoreConfig) {
        let mut applied = Vec::new();

        if let Ok(dir) = std::env::var(GAITSTORE_DATA_DIR_VAR) {
            config.data_dir = PathBuf::from(dir);
            applied.push(GAITSTORE_DATA_DIR_VAR);
        }

        if let Ok(path) = std::env::var(GAITSTORE_DATABASE_VAR) {
            config.store.database_path = Some(PathBuf::from(path));
            applied.push(GAITSTORE_DATABASE_VAR);
        }

        if let Ok(dir) = std::env::var(GAITSTORE_BACKUP_DIR_VAR) {
            config.backup.root = Some(PathBuf::from(dir));
            applied.push(GAITSTORE_BACKUP_DIR_VAR);
        }

        if let Ok(backend) = std::env::var(GAITSTORE_DEFAULT_BACKEND_VAR) {
            config.storage.default_backend = backend;
            applied.push(GAITSTORE_DEFAULT_BACKEND_VAR);
        }

        if let Ok(ttl) = std::env::var(GAITSTORE_CACHE_TTL_DAYS_VAR) {
            match ttl.parse::<u64>() {
                Ok(days) => {
                    config.cache.ttl_days = days;
                    applied.push(GAITSTORE_CACHE_TTL_DAYS_VAR);
                }
                Err(_) => tracing::warn!("Ignoring invalid {GAITSTORE_CACHE_TTL_DAYS_VAR}={ttl}"),
            }
        }

        if let Ok(days) = std::env::var(GAITSTORE_BACKUP_RETENTION_DAYS_VAR) {
            match days.parse::<u32>() {
                Ok(days) => {
                    config.backup.retention_days = days;
                    applied.push(GAITSTORE_BACKUP_RETENTION_DAYS_VAR);
                }
                Err(_) => {
                    tracing::warn!("Ignoring invalid {GAITSTORE_BACKUP_RETENTION_DAYS_VAR}={days}")
                }
            }
        }

        if let Some(last) = applied.last() {
            config.source = ConfigSource::EnvironmentVariable((*last).to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn clear_env() {
        for var in [
            GAITSTORE_DATA_DIR_VAR,
            GAITSTORE_DATABASE_VAR,
            GAITSTORE_CACHE_TTL_DAYS_VAR,
            GAITSTORE_BACKUP_DIR_VAR,
            GAITSTORE_BACKUP_RETENTION_DAYS_VAR,
            GAITSTORE_DEFAULT_BACKEND_VAR,
        ] {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_file_then_env_precedence() {
        clear_env();
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("config.json");
        std::fs::write(
            &file,
            r#"{"data_dir": "/from/file", "cache": {"ttl_days": 3}, "backup": {"retention_days": 14}}"#,
        )
        .unwrap();

        std::env::set_var(GAITSTORE_CACHE_TTL_DAYS_VAR, "5");
        let config = ConfigLoader::new().config_file(&file).load().unwrap();
        clear_env();

        assert_eq!(config.data_dir, PathBuf::from("/from/file"));
        assert_eq!(config.cache.ttl_days, 5);
        assert_eq!(config.backup.retention_days, 14);
        assert_eq!(
            config.source,
            ConfigSource::EnvironmentVariable(GAITSTORE_CACHE_TTL_DAYS_VAR.to_string())
        );
    }

    #[test]
    #[serial]
    fn test_command_line_data_dir_wins() {
        clear_env();
        std::env::set_var(GAITSTORE_DATA_DIR_VAR, "/from/env");
        let dir = TempDir::new().unwrap();
        let config = ConfigLoader::new()
            .config_file(write_empty_config(&dir))
            .data_dir("/from/cli")
            .load()
            .unwrap();
        clear_env();

        assert_eq!(config.data_dir, PathBuf::from("/from/cli"));
        assert_eq!(config.source, ConfigSource::CommandLine);
    }

    #[test]
    #[serial]
    fn test_invalid_env_value_is_ignored() {
        clear_env();
        std::env::set_var(GAITSTORE_CACHE_TTL_DAYS_VAR, "a week");
        let dir = TempDir::new().unwrap();
        let config = ConfigLoader::new()
            .config_file(write_empty_config(&dir))
            .load()
            .unwrap();
        clear_env();

        assert_eq!(config.cache.ttl_days, 7);
    }

    #[test]
    #[serial]
    fn test_missing_explicit_file_is_an_error() {
        clear_env();
        let err = ConfigLoader::new()
            .config_file("/nonexistent/gaitstore.json")
            .load()
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    #[serial]
    fn test_ignore_env() {
        clear_env();
        std::env::set_var(GAITSTORE_DEFAULT_BACKEND_VAR, "json");
        let dir = TempDir::new().unwrap();
        let config = ConfigLoader::new()
            .config_file(write_empty_config(&dir))
            .ignore_env(true)
            .load()
            .unwrap();
        clear_env();

        assert_eq!(config.storage.default_backend, "binary");
    }

    fn write_empty_config(dir: &TempDir) -> PathBuf {
        let file = dir.path().join("config.json");
        std::fs::write(&file, "{}").unwrap();
        file
    }
}
