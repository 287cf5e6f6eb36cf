use clap::Parser;
use eyre::WrapErr;
use gaitstore_config::ConfigLoader;
use std::path::PathBuf;
use std::sync::Arc;

mod commands;

use commands::Commands;

#[derive(Parser)]
#[command(name = "gaitstore")]
#[command(about = "Manage gait analysis storage, caches and backups", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to $XDG_CONFIG_HOME/gaitstore/config.json)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Data directory holding the database, storage root and backups
    #[arg(long, global = true, value_name = "PATH")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    if let Err(e) = gaitstore_utils::tracing::init() {
        eprintln!("Failed to initialize tracing: {e}");
    }

    let cli = Cli::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = cli.config {
        loader = loader.config_file(path);
    }
    if let Some(data_dir) = cli.data_dir {
        loader = loader.data_dir(data_dir);
    }
    let config = loader.load().wrap_err("failed to load configuration")?;

    cli.command.execute(Arc::new(config)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "gaitstore",
            "store",
            "stats",
            "--data-dir",
            "/srv/gait",
        ])
        .unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("/srv/gait")));
    }

    #[test]
    fn test_unknown_backup_kind_is_rejected() {
        assert!(Cli::try_parse_from(["gaitstore", "backup", "create", "--kind", "weekly"]).is_err());
    }
}
