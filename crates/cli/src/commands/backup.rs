use crate::commands::{format_bytes, print_json, run_blocking};
use clap::Subcommand;
use gaitstore_backup::{BackupKind, BackupManager, BackupRequest};
use gaitstore_config::GaitStoreConfig;
use gaitstore_core::Error;
use gaitstore_utils::tracing::operation_span;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Subcommand)]
pub enum BackupCommands {
    /// Create a new backup
    Create {
        /// What to back up: full, database, storage or custom
        #[arg(long, default_value = "full")]
        kind: BackupKind,
        /// Copy files into a directory instead of a .tar.gz archive
        #[arg(long)]
        no_compress: bool,
        /// Skip verification after creation
        #[arg(long)]
        no_verify: bool,
        /// Files or directories to include (defaults depend on --kind)
        sources: Vec<PathBuf>,
    },
    /// List backups, newest first
    List {
        /// Print the listing as JSON
        #[arg(long)]
        json: bool,
    },
    /// Verify a backup against its recorded checksum
    Verify { name: String },
    /// Restore a backup into a directory
    Restore {
        name: String,
        destination: PathBuf,
        /// Restore without verifying first
        #[arg(long)]
        skip_verify: bool,
    },
    /// Delete a backup and its manifest entry
    Delete { name: String },
    /// Delete backups older than the retention period
    Prune {
        /// Retention period in days (defaults to the configured value)
        #[arg(long)]
        days: Option<u32>,
    },
}

impl BackupCommands {
    pub async fn execute(self, config: Arc<GaitStoreConfig>) -> eyre::Result<()> {
        match self {
            BackupCommands::Create {
                kind,
                no_compress,
                no_verify,
                sources,
            } => {
                let mut request = if sources.is_empty() {
                    BackupRequest::from_config(&config, kind)
                } else {
                    BackupRequest::new(kind, sources)
                        .compress(config.backup.compress)
                        .verify(config.backup.verify)
                };
                if no_compress {
                    request = request.compress(false);
                }
                if no_verify {
                    request = request.verify(false);
                }

                let backup = run_blocking(move || {
                    let _span = operation_span("backup", "create").entered();
                    BackupManager::from_config(&config)?.create_backup(&request)
                })
                .await?;

                println!("Created backup {}", backup.name);
                println!("  Files: {}", backup.files_backed_up);
                println!("  Size: {}", format_bytes(backup.total_size_bytes));
                println!("  Verified: {}", backup.verified);
                Ok(())
            }
            BackupCommands::List { json } => {
                let (backups, stats) = run_blocking(move || {
                    let manager = BackupManager::from_config(&config)?;
                    let backups: Vec<_> = manager.list_backups().into_iter().cloned().collect();
                    Ok((backups, manager.statistics()))
                })
                .await?;

                if json {
                    return print_json(&backups);
                }
                if backups.is_empty() {
                    println!("No backups found");
                    return Ok(());
                }
                for backup in &backups {
                    println!(
                        "{:<40} {:<9} {} {:>10} {}{}",
                        backup.name,
                        backup.kind.as_str(),
                        backup.created_at.format("%Y-%m-%d %H:%M:%S"),
                        format_bytes(backup.total_size_bytes),
                        if backup.compressed { "tar.gz" } else { "dir" },
                        if backup.verified { " verified" } else { "" },
                    );
                }
                println!(
                    "{} backups, {} total, retention {} days",
                    stats.count,
                    format_bytes(stats.total_size_bytes),
                    stats.retention_days
                );
                Ok(())
            }
            BackupCommands::Verify { name } => {
                let report = run_blocking(move || {
                    let _span = operation_span("backup", "verify").entered();
                    BackupManager::from_config(&config)?.verify_backup(&name)
                })
                .await?;

                if report.is_valid() {
                    println!("✓ Backup {} is valid", report.name);
                    Ok(())
                } else {
                    for error in &report.errors {
                        println!("✗ {error}");
                    }
                    eyre::bail!("backup {} failed verification", report.name)
                }
            }
            BackupCommands::Restore {
                name,
                destination,
                skip_verify,
            } => {
                let shown = destination.display().to_string();
                let restored = run_blocking(move || {
                    let _span = operation_span("backup", "restore").entered();
                    BackupManager::from_config(&config)?.restore_backup(
                        &name,
                        &destination,
                        !skip_verify,
                    )
                })
                .await?;
                println!("✓ Restored {restored} items into {shown}");
                Ok(())
            }
            BackupCommands::Delete { name } => {
                let target = name.clone();
                let deleted = run_blocking(move || {
                    let mut manager = BackupManager::from_config(&config)?;
                    if manager.get_backup(&name).is_none() {
                        return Err(Error::not_found("backup", name));
                    }
                    manager.delete_backup(&name)
                })
                .await?;

                if deleted {
                    println!("✓ Deleted backup {target}");
                } else {
                    println!("Backup {target} had no artifacts left; manifest entry kept");
                }
                Ok(())
            }
            BackupCommands::Prune { days } => {
                let days = days.unwrap_or(config.backup.retention_days);
                let deleted = run_blocking(move || {
                    let _span = operation_span("backup", "prune").entered();
                    BackupManager::from_config(&config)?.apply_retention_policy(days)
                })
                .await?;
                println!("✓ Deleted {deleted} backups older than {days} days");
                Ok(())
            }
        }
    }
}
