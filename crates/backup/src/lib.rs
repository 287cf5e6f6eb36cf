//! Backups of the gaitstore data directory.
//!
//! A [`BackupManager`] owns one backup root containing timestamp-named
//! directories or `.tar.gz` archives plus `manifest.json`, the only record
//! of which backups exist.

mod archive;
mod manager;
mod manifest;

pub use manager::{BackupManager, BackupRequest, BackupStatistics, VerificationReport};
pub use manifest::{BackupDescriptor, BackupKind, BackupManifest};
