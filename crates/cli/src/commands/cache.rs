use crate::commands::{print_json, run_blocking};
use clap::Subcommand;
use gaitstore_cache::ResultCache;
use gaitstore_config::GaitStoreConfig;
use gaitstore_store::StructuredStore;
use std::sync::Arc;

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Show cache entry counts per tier
    Stats {
        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },
    /// Clear file cache entries (stored results are kept)
    Clear {
        /// Only entries of this dataset
        #[arg(long)]
        dataset: Option<String>,
        /// Only entries of this sequence
        #[arg(long)]
        sequence: Option<String>,
    },
    /// Remove file cache entries older than the TTL
    PurgeExpired,
}

fn open_cache(config: &GaitStoreConfig) -> gaitstore_core::Result<ResultCache> {
    let store = Arc::new(StructuredStore::from_config(config)?);
    ResultCache::from_config(config, store)
}

impl CacheCommands {
    pub async fn execute(self, config: Arc<GaitStoreConfig>) -> eyre::Result<()> {
        match self {
            CacheCommands::Stats { json } => {
                let ttl_days = config.cache.ttl_days;
                let stats = run_blocking(move || open_cache(&config)?.statistics()).await?;

                if json {
                    return print_json(&stats);
                }
                println!("Cache Statistics:");
                println!("  Stored results: {}", stats.store_entries);
                println!("  File entries: {}", stats.file_entries);
                println!("  TTL: {ttl_days} days");
                Ok(())
            }
            CacheCommands::Clear { dataset, sequence } => {
                let removed =
                    run_blocking(move || open_cache(&config)?.clear(dataset.as_deref(), sequence.as_deref()))
                        .await?;
                println!("✓ Removed {removed} file cache entries");
                Ok(())
            }
            CacheCommands::PurgeExpired => {
                let removed = run_blocking(move || open_cache(&config)?.purge_expired()).await?;
                println!("✓ Purged {removed} expired file cache entries");
                Ok(())
            }
        }
    }
}
