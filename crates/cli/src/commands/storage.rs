use crate::commands::run_blocking;
use clap::Subcommand;
use gaitstore_config::GaitStoreConfig;
use gaitstore_storage::StorageManager;
use std::sync::Arc;

#[derive(Subcommand)]
pub enum StorageCommands {
    /// List logical keys in the storage root
    List {
        /// Only keys starting with this prefix
        #[arg(long)]
        prefix: Option<String>,
    },
    /// Delete an artifact and its metadata sidecar
    Delete { key: String },
}

impl StorageCommands {
    pub async fn execute(self, config: Arc<GaitStoreConfig>) -> eyre::Result<()> {
        match self {
            StorageCommands::List { prefix } => {
                let keys = run_blocking(move || {
                    StorageManager::from_config(&config)?.list_keys(prefix.as_deref())
                })
                .await?;
                for key in &keys {
                    println!("{key}");
                }
                Ok(())
            }
            StorageCommands::Delete { key } => {
                let shown = key.clone();
                let deleted =
                    run_blocking(move || StorageManager::from_config(&config)?.delete(&key))
                        .await?;
                if deleted {
                    println!("✓ Deleted {shown}");
                } else {
                    println!("Nothing stored under {shown}");
                }
                Ok(())
            }
        }
    }
}
