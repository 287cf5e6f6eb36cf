use crate::commands::{format_bytes, print_json, run_blocking};
use clap::Subcommand;
use gaitstore_config::GaitStoreConfig;
use gaitstore_store::StructuredStore;
use gaitstore_utils::tracing::operation_span;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Subcommand)]
pub enum StoreCommands {
    /// Show row counts and database size
    Stats {
        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },
    /// Rebuild the database file to reclaim space
    Vacuum,
    /// Write a consistent copy of the database
    Snapshot { path: PathBuf },
}

impl StoreCommands {
    pub async fn execute(self, config: Arc<GaitStoreConfig>) -> eyre::Result<()> {
        match self {
            StoreCommands::Stats { json } => {
                let stats =
                    run_blocking(move || StructuredStore::from_config(&config)?.statistics())
                        .await?;

                if json {
                    return print_json(&stats);
                }
                println!("Store Statistics:");
                println!("  Analyses: {}", stats.total_analyses());
                for (status, count) in &stats.analyses_by_status {
                    println!("    {status}: {count}");
                }
                println!("  Classifications: {}", stats.classifications);
                println!("  Training datasets: {}", stats.training_datasets);
                println!("  Training samples: {}", stats.training_samples);
                println!("  Pose results: {}", stats.pose_results);
                println!("  Database size: {}", format_bytes(stats.database_size_bytes));
                Ok(())
            }
            StoreCommands::Vacuum => {
                run_blocking(move || {
                    let _span = operation_span("store", "vacuum").entered();
                    StructuredStore::from_config(&config)?.vacuum()
                })
                .await?;
                println!("✓ Database vacuumed");
                Ok(())
            }
            StoreCommands::Snapshot { path } => {
                let shown = path.display().to_string();
                run_blocking(move || {
                    let _span = operation_span("store", "snapshot").entered();
                    StructuredStore::from_config(&config)?.backup_to(&path)
                })
                .await?;
                println!("✓ Database snapshot written to {shown}");
                Ok(())
            }
        }
    }
}
