//! CLI entry point for the filegate tool.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use filegate_core::{Database, SqliteStore};
use tracing::debug;

mod cli;
mod commands;
mod config;

use cli::{Cli, Command, ConfigAction};
use config::{EffectiveConfig, FileConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let cli = Cli::parse();

    let loaded = config::load_config(cli.config.as_deref())?;
    init_tracing(&cli, loaded.config.as_ref());

    debug!(?cli, "CLI arguments parsed");
    let effective = EffectiveConfig::resolve(cli.db.as_deref(), loaded.config.as_ref());
    debug!(?effective, "effective configuration");

    if let Command::Config {
        action: ConfigAction::Show,
    } = cli.command
    {
        commands::show_config(&loaded, &effective);
        return Ok(());
    }

    let db = Database::new(&effective.db_path, effective.database)
        .await
        .with_context(|| {
            format!(
                "Failed to open record database '{}'",
                effective.db_path.display()
            )
        })?;
    let store = Arc::new(SqliteStore::new(db.clone()));

    let result = commands::run(cli.command, store, effective.access).await;
    db.close().await;
    result
}

/// Installs the fmt subscriber on stderr.
///
/// Priority: `RUST_LOG` > `--quiet` > `-v`/`-vv` > config verbosity > info.
fn init_tracing(cli: &Cli, file_config: Option<&FileConfig>) {
    let default_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => file_config
                .and_then(|c| c.verbosity)
                .map_or("info", |v| v.filter()),
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
