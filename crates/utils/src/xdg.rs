use gaitstore_core::{APP_DIRNAME, CONFIG_FILENAME};
use std::env;
use std::path::PathBuf;

/// XDG Base Directory paths for gaitstore
pub struct XdgPaths;

impl XdgPaths {
    /// Get XDG_CONFIG_HOME/gaitstore or fallback
    pub fn config_dir() -> PathBuf {
        env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .map(|home| home.join(".config"))
                    .unwrap_or_else(|| PathBuf::from(".config"))
            })
            .join(APP_DIRNAME)
    }

    /// Get XDG_DATA_HOME/gaitstore or fallback
    pub fn data_dir() -> PathBuf {
        env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .map(|home| home.join(".local/share"))
                    .unwrap_or_else(|| PathBuf::from(".local/share"))
            })
            .join(APP_DIRNAME)
    }

    /// Path of the JSON configuration file
    pub fn config_file() -> PathBuf {
        Self::config_dir().join(CONFIG_FILENAME)
    }
}
