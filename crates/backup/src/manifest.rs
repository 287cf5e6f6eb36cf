//! The backup manifest: sole record of which backups exist.

use chrono::{DateTime, Utc};
use gaitstore_core::{Error, Result, DEFAULT_RETENTION_DAYS};
use gaitstore_utils::atomic_file::write_atomic_json;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// What a backup captures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupKind {
    /// Database and storage root
    Full,
    Database,
    Storage,
    /// Caller-chosen sources
    Custom,
}

impl BackupKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            BackupKind::Full => "full",
            BackupKind::Database => "database",
            BackupKind::Storage => "storage",
            BackupKind::Custom => "custom",
        }
    }
}

impl fmt::Display for BackupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackupKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "full" => Ok(BackupKind::Full),
            "database" => Ok(BackupKind::Database),
            "storage" => Ok(BackupKind::Storage),
            "custom" => Ok(BackupKind::Custom),
            other => Err(Error::configuration(format!("unknown backup kind '{other}'"))),
        }
    }
}

/// One backup as recorded in the manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: BackupKind,
    pub created_at: DateTime<Utc>,
    pub compressed: bool,
    pub files_backed_up: u64,
    pub total_size_bytes: u64,
    pub checksum: String,
    pub verified: bool,
    /// Artifact name to path relative to the backup root
    #[serde(default)]
    pub artifacts: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupManifest {
    #[serde(default)]
    pub backups: Vec<BackupDescriptor>,
    #[serde(default)]
    pub last_backup: Option<DateTime<Utc>>,
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_retention_days() -> u32 {
    DEFAULT_RETENTION_DAYS
}

impl Default for BackupManifest {
    fn default() -> Self {
        Self {
            backups: Vec::new(),
            last_backup: None,
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }
}

impl BackupManifest {
    /// Read the manifest at `path`; a missing file yields an empty manifest.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(Error::file_system(path, "read backup manifest", e)),
        };
        serde_json::from_str(&content).map_err(|e| {
            Error::serialization(path.display().to_string(), "decode backup manifest", e)
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_atomic_json(path, self)
    }

    pub fn get(&self, name: &str) -> Option<&BackupDescriptor> {
        self.backups.iter().find(|b| b.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut BackupDescriptor> {
        self.backups.iter_mut().find(|b| b.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Record a new backup
    pub fn insert(&mut self, descriptor: BackupDescriptor) {
        self.last_backup = Some(
            self.last_backup
                .map_or(descriptor.created_at, |last| last.max(descriptor.created_at)),
        );
        self.backups.push(descriptor);
    }

    pub fn remove(&mut self, name: &str) -> Option<BackupDescriptor> {
        let index = self.backups.iter().position(|b| b.name == name)?;
        Some(self.backups.remove(index))
    }
}
