//! Backup lifecycle: create, verify, restore, delete and retention.

use crate::archive::{self, TreeSize};
use crate::manifest::{BackupDescriptor, BackupKind, BackupManifest};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use gaitstore_config::GaitStoreConfig;
use gaitstore_core::{Error, Result, MANIFEST_FILENAME};
use gaitstore_utils::atomic_file::temp_path_for;
use gaitstore_utils::hashing::hash_file;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const ARCHIVE_EXTENSION: &str = "tar.gz";
const ARCHIVE_ARTIFACT: &str = "archive";

/// Parameters for [`BackupManager::create_backup`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRequest {
    pub kind: BackupKind,
    pub sources: Vec<PathBuf>,
    pub compress: bool,
    pub verify: bool,
}

impl BackupRequest {
    pub fn new(kind: BackupKind, sources: Vec<PathBuf>) -> Self {
        Self {
            kind,
            sources,
            compress: true,
            verify: true,
        }
    }

    /// Request for `kind` with sources and flags taken from the configuration
    pub fn from_config(config: &GaitStoreConfig, kind: BackupKind) -> Self {
        let sources = match kind {
            BackupKind::Database => vec![config.database_path()],
            BackupKind::Storage => vec![config.storage_root()],
            BackupKind::Full | BackupKind::Custom => config.backup_sources(),
        };
        Self {
            kind,
            sources,
            compress: config.backup.compress,
            verify: config.backup.verify,
        }
    }

    pub fn compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }
}

/// Outcome of checking a backup against its manifest entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub name: String,
    pub exists: bool,
    pub expected_checksum: String,
    pub actual_checksum: Option<String>,
    pub expected_files: u64,
    /// `None` when the file count was not checked
    pub actual_files: Option<u64>,
    pub errors: Vec<String>,
}

impl VerificationReport {
    pub fn is_valid(&self) -> bool {
        self.exists && self.errors.is_empty()
    }

    pub fn checksum_matches(&self) -> bool {
        self.actual_checksum.as_deref() == Some(self.expected_checksum.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupStatistics {
    pub count: usize,
    pub total_size_bytes: u64,
    pub verified: usize,
    pub compressed: usize,
    pub last_backup: Option<DateTime<Utc>>,
    pub retention_days: u32,
}

/// Creates and tracks backups under a single root directory.
///
/// The manifest (`manifest.json` in the root) is the only record of which
/// backups exist. It is held in memory and rewritten atomically after every
/// mutation.
#[derive(Debug)]
pub struct BackupManager {
    root: PathBuf,
    manifest_path: PathBuf,
    manifest: BackupManifest,
}

impl BackupManager {
    /// Open the backup root, loading its manifest if present
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| Error::file_system(&root, "create backup root", e))?;
        let manifest_path = root.join(MANIFEST_FILENAME);
        let manifest = BackupManifest::load(&manifest_path)?;
        debug!(root = %root.display(), backups = manifest.backups.len(), "Opened backup root");

        Ok(Self {
            root,
            manifest_path,
            manifest,
        })
    }

    /// Open the configured backup root; a fresh manifest takes the configured retention.
    pub fn from_config(config: &GaitStoreConfig) -> Result<Self> {
        let root = config.backup_root();
        let fresh = !root.join(MANIFEST_FILENAME).exists();
        let mut manager = Self::open(root)?;
        if fresh {
            manager.manifest.retention_days = config.backup.retention_days;
        }
        Ok(manager)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest(&self) -> &BackupManifest {
        &self.manifest
    }

    fn persist(&self) -> Result<()> {
        self.manifest.save(&self.manifest_path)
    }

    fn unique_name(&self, kind: BackupKind, now: DateTime<Utc>) -> String {
        let base = format!("{kind}_{}", now.format("%Y%m%d_%H%M%S"));
        let taken = |name: &str| {
            self.manifest.contains(name)
                || self.root.join(name).exists()
                || self.root.join(format!("{name}.{ARCHIVE_EXTENSION}")).exists()
        };
        if !taken(&base) {
            return base;
        }
        let mut suffix = 1;
        loop {
            let candidate = format!("{base}_{suffix}");
            if !taken(&candidate) {
                return candidate;
            }
            suffix += 1;
        }
    }

    /// Resolve request sources to unique entry names, skipping missing paths.
    fn resolve_sources(sources: &[PathBuf]) -> Result<Vec<(String, PathBuf)>> {
        if sources.is_empty() {
            return Err(Error::configuration("backup request has no sources"));
        }

        let mut seen = HashSet::new();
        let mut resolved = Vec::new();
        for source in sources {
            if !source.exists() {
                warn!(source = %source.display(), "Backup source does not exist, skipping");
                continue;
            }
            let name = source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    Error::configuration(format!(
                        "backup source '{}' has no file name",
                        source.display()
                    ))
                })?;
            if !seen.insert(name.clone()) {
                return Err(Error::configuration(format!(
                    "two backup sources share the name '{name}'"
                )));
            }
            resolved.push((name, source.clone()));
        }

        if resolved.is_empty() {
            return Err(Error::not_found("backup source", format!("{sources:?}")));
        }
        Ok(resolved)
    }

    /// Capture the requested sources as a new backup and record it.
    pub fn create_backup(&mut self, request: &BackupRequest) -> Result<BackupDescriptor> {
        let sources = Self::resolve_sources(&request.sources)?;
        let now = Utc::now();
        let name = self.unique_name(request.kind, now);

        let mut size = TreeSize::default();
        for (_, source) in &sources {
            let measured = archive::measure(source)?;
            size.files += measured.files;
            size.bytes += measured.bytes;
        }

        let (checksum, artifacts, staged) = if request.compress {
            let relative = format!("{name}.{ARCHIVE_EXTENSION}");
            let archive_path = self.root.join(&relative);
            archive::write_archive(&archive_path, &sources)?;
            let checksum = discard_on_error(&archive_path, hash_file(&archive_path))?;
            (
                checksum,
                BTreeMap::from([(ARCHIVE_ARTIFACT.to_string(), relative)]),
                archive_path,
            )
        } else {
            let backup_dir = self.root.join(&name);
            let mut artifacts = BTreeMap::new();
            for (entry, source) in &sources {
                discard_on_error(
                    &backup_dir,
                    archive::copy_tree(source, &backup_dir.join(entry)),
                )?;
                artifacts.insert(entry.clone(), format!("{name}/{entry}"));
            }
            let checksum = discard_on_error(&backup_dir, archive::tree_checksum(&backup_dir))?;
            (checksum, artifacts, backup_dir)
        };

        let previous = self.manifest.clone();
        self.manifest.insert(BackupDescriptor {
            name: name.clone(),
            kind: request.kind,
            created_at: now,
            compressed: request.compress,
            files_backed_up: size.files,
            total_size_bytes: size.bytes,
            checksum,
            verified: false,
            artifacts,
        });
        if let Err(e) = self.persist() {
            self.manifest = previous;
            let _ = archive::remove_path(&staged);
            return Err(e);
        }
        info!(
            name = %name,
            kind = %request.kind,
            files = size.files,
            bytes = size.bytes,
            compressed = request.compress,
            "Created backup"
        );

        if request.verify {
            let report = self.verify_backup(&name)?;
            if !report.is_valid() {
                warn!(name = %name, errors = ?report.errors, "New backup failed verification");
            }
        }

        self.get_backup(&name)
            .cloned()
            .ok_or_else(|| Error::not_found("backup", name))
    }

    fn artifact_paths(&self, descriptor: &BackupDescriptor) -> Vec<(String, PathBuf)> {
        descriptor
            .artifacts
            .iter()
            .map(|(entry, relative)| (entry.clone(), self.root.join(relative)))
            .collect()
    }

    fn inspect(&self, descriptor: &BackupDescriptor) -> Result<VerificationReport> {
        let mut report = VerificationReport {
            name: descriptor.name.clone(),
            exists: true,
            expected_checksum: descriptor.checksum.clone(),
            actual_checksum: None,
            expected_files: descriptor.files_backed_up,
            actual_files: None,
            errors: Vec::new(),
        };

        let artifacts = self.artifact_paths(descriptor);
        let missing: Vec<_> = artifacts
            .iter()
            .filter(|(_, path)| !path.exists())
            .map(|(entry, _)| entry.clone())
            .collect();
        if artifacts.is_empty() || !missing.is_empty() {
            report.exists = false;
            report
                .errors
                .push(format!("missing backup artifacts: {missing:?}"));
            return Ok(report);
        }

        if descriptor.compressed {
            // Entry counts inside the archive are not checked
            let (_, archive_path) = &artifacts[0];
            report.actual_checksum = Some(hash_file(archive_path)?);
        } else {
            let backup_dir = self.root.join(&descriptor.name);
            report.actual_checksum = Some(archive::tree_checksum(&backup_dir)?);
            let files = archive::measure(&backup_dir)?.files;
            report.actual_files = Some(files);
            if files != descriptor.files_backed_up {
                report.errors.push(format!(
                    "file count mismatch: expected {}, found {files}",
                    descriptor.files_backed_up
                ));
            }
        }

        if !report.checksum_matches() {
            report.errors.push(format!(
                "checksum mismatch: expected {}, found {}",
                report.expected_checksum,
                report.actual_checksum.as_deref().unwrap_or("none")
            ));
        }
        Ok(report)
    }

    /// Check a backup's artifacts and checksum, recording the result.
    pub fn verify_backup(&mut self, name: &str) -> Result<VerificationReport> {
        let descriptor = self
            .manifest
            .get(name)
            .cloned()
            .ok_or_else(|| Error::not_found("backup", name))?;
        let report = self.inspect(&descriptor)?;

        if let Some(entry) = self.manifest.get_mut(name) {
            entry.verified = report.is_valid();
        }
        self.persist()?;
        info!(name, valid = report.is_valid(), "Verified backup");
        Ok(report)
    }

    /// Restore a backup into `destination`, returning the number of top-level items restored.
    ///
    /// With `verify_first`, a failed verification aborts before the
    /// destination is touched.
    pub fn restore_backup(
        &mut self,
        name: &str,
        destination: &Path,
        verify_first: bool,
    ) -> Result<usize> {
        let descriptor = self
            .manifest
            .get(name)
            .cloned()
            .ok_or_else(|| Error::not_found("backup", name))?;

        if verify_first {
            let report = self.verify_backup(name)?;
            if !report.is_valid() {
                return Err(Error::integrity(
                    name,
                    report.expected_checksum,
                    report
                        .actual_checksum
                        .unwrap_or_else(|| "missing artifacts".to_string()),
                ));
            }
        }

        let artifacts = self.artifact_paths(&descriptor);
        let restored = if descriptor.compressed {
            let mut restored = 0;
            for (_, archive_path) in &artifacts {
                restored += archive::archive_entries(archive_path)?.len();
                archive::extract_archive(archive_path, destination)?;
            }
            restored
        } else {
            if let Some((entry, _)) = artifacts.iter().find(|(_, source)| !source.exists()) {
                return Err(Error::not_found(
                    "backup artifact",
                    format!("{name}/{entry}"),
                ));
            }
            fs::create_dir_all(destination).map_err(|e| {
                Error::file_system(destination, "create restore destination", e)
            })?;

            // Every item is staged before any live item is replaced
            let mut staged = Vec::with_capacity(artifacts.len());
            for (entry, source) in &artifacts {
                let target = destination.join(entry);
                let staging = match temp_path_for(&target) {
                    Ok(staging) => staging,
                    Err(e) => {
                        discard_staged(&staged);
                        return Err(e);
                    }
                };
                if let Err(e) = archive::copy_tree(source, &staging) {
                    let _ = archive::remove_path(&staging);
                    discard_staged(&staged);
                    return Err(e);
                }
                staged.push((staging, target));
            }

            for (staging, target) in &staged {
                if archive::remove_path(target)? {
                    debug!(target = %target.display(), "Replaced existing item during restore");
                }
                fs::rename(staging, target)
                    .map_err(|e| Error::file_system(target, "move restored item into place", e))?;
            }
            artifacts.len()
        };

        info!(name, destination = %destination.display(), restored, "Restored backup");
        Ok(restored)
    }

    /// Delete a backup's artifacts and, if anything was removed, its manifest entry.
    ///
    /// Besides indexed artifacts, any file in the root named `<name>.<ext>`
    /// is treated as belonging to the backup.
    pub fn delete_backup(&mut self, name: &str) -> Result<bool> {
        let mut candidates: Vec<PathBuf> = self
            .manifest
            .get(name)
            .map(|d| self.artifact_paths(d).into_iter().map(|(_, p)| p).collect())
            .unwrap_or_default();
        if self.manifest.get(name).is_some_and(|d| !d.compressed) {
            candidates.push(self.root.join(name));
        }

        let prefix = format!("{name}.");
        let entries = fs::read_dir(&self.root)
            .map_err(|e| Error::file_system(&self.root, "list backup root", e))?;
        for entry in entries {
            let entry = entry.map_err(|e| Error::file_system(&self.root, "list backup root", e))?;
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if file_name.starts_with(&prefix) && file_name != MANIFEST_FILENAME {
                candidates.push(entry.path());
            }
        }
        candidates.sort();
        candidates.dedup();

        let mut deleted = false;
        for path in &candidates {
            if archive::remove_path(path)? {
                debug!(path = %path.display(), "Removed backup artifact");
                deleted = true;
            }
        }

        if deleted && self.manifest.remove(name).is_some() {
            self.persist()?;
        }
        if deleted {
            info!(name, "Deleted backup");
        }
        Ok(deleted)
    }

    /// Delete every backup older than `days` and keep `days` as the retention setting.
    pub fn apply_retention_policy(&mut self, days: u32) -> Result<usize> {
        let cutoff = Utc::now() - ChronoDuration::days(i64::from(days));
        let expired: Vec<String> = self
            .manifest
            .backups
            .iter()
            .filter(|b| b.created_at < cutoff)
            .map(|b| b.name.clone())
            .collect();

        let mut deleted = 0;
        for name in expired {
            if self.delete_backup(&name)? {
                deleted += 1;
            } else {
                warn!(name = %name, "Expired backup had no artifacts to delete");
            }
        }

        self.manifest.retention_days = days;
        self.persist()?;
        info!(days, deleted, "Applied backup retention policy");
        Ok(deleted)
    }

    /// Backups newest first
    pub fn list_backups(&self) -> Vec<&BackupDescriptor> {
        let mut backups: Vec<_> = self.manifest.backups.iter().collect();
        backups.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.name.cmp(&a.name)));
        backups
    }

    pub fn get_backup(&self, name: &str) -> Option<&BackupDescriptor> {
        self.manifest.get(name)
    }

    pub fn statistics(&self) -> BackupStatistics {
        let backups = &self.manifest.backups;
        BackupStatistics {
            count: backups.len(),
            total_size_bytes: backups.iter().map(|b| b.total_size_bytes).sum(),
            verified: backups.iter().filter(|b| b.verified).count(),
            compressed: backups.iter().filter(|b| b.compressed).count(),
            last_backup: self.manifest.last_backup,
            retention_days: self.manifest.retention_days,
        }
    }
}

/// Remove a partially written artifact when a later step fails
fn discard_on_error<T>(path: &Path, result: Result<T>) -> Result<T> {
    if result.is_err() {
        let _ = archive::remove_path(path);
    }
    result
}

fn discard_staged(staged: &[(PathBuf, PathBuf)]) {
    for (staging, _) in staged {
        let _ = archive::remove_path(staging);
    }
}
