use clap::Subcommand;
use eyre::WrapErr;
use gaitstore_config::GaitStoreConfig;
use std::sync::Arc;

pub mod backup;
pub mod cache;
pub mod storage;
pub mod store;

use self::backup::BackupCommands;
use self::cache::CacheCommands;
use self::storage::StorageCommands;
use self::store::StoreCommands;

#[derive(Subcommand)]
pub enum Commands {
    /// Create, verify, restore and prune backups
    Backup {
        #[command(subcommand)]
        command: BackupCommands,
    },

    /// Inspect and maintain the analysis database
    Store {
        #[command(subcommand)]
        command: StoreCommands,
    },

    /// Inspect and clear the result cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },

    /// List and delete stored artifacts
    Storage {
        #[command(subcommand)]
        command: StorageCommands,
    },
}

impl Commands {
    pub async fn execute(self, config: Arc<GaitStoreConfig>) -> eyre::Result<()> {
        match self {
            Commands::Backup { command } => command.execute(config).await,
            Commands::Store { command } => command.execute(config).await,
            Commands::Cache { command } => command.execute(config).await,
            Commands::Storage { command } => command.execute(config).await,
        }
    }
}

/// Run blocking storage work on the tokio blocking pool
pub(crate) async fn run_blocking<T, F>(f: F) -> eyre::Result<T>
where
    F: FnOnce() -> gaitstore_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let result = tokio::task::spawn_blocking(f)
        .await
        .wrap_err("blocking task did not complete")?;
    Ok(result?)
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> eyre::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
