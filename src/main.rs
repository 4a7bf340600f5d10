//! CLI entry point for the libtrack tool.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use libtrack_core::library::{
    DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_READ_TIMEOUT_SECS, configure_library_http_timeouts,
};
use libtrack_core::user_agent::tool_identifier;
use libtrack_core::{Database, NwplEndpoints, Store, build_default_adapter_registry};
use tracing::{debug, info};

mod app_config;
mod cli;
mod commands;

use app_config::FileConfig;
use cli::{Args, Command};

const DEFAULT_DATABASE_PATH: &str = "libtrack.db";

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();
    let loaded_config = app_config::load_config(args.config.as_deref())?;
    let file_config = loaded_config.file_config();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > config verbosity > info
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => file_config.verbosity.map_or("info", |v| v.level()),
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

    debug!(
        verbose = args.verbose,
        quiet = args.quiet,
        config_path = ?loaded_config.path,
        "CLI arguments parsed"
    );
    info!(version = %tool_identifier(), "Libtrack starting");

    configure_library_http_timeouts(
        file_config
            .connect_timeout_secs
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
        file_config
            .read_timeout_secs
            .unwrap_or(DEFAULT_READ_TIMEOUT_SECS),
    );
    let registry = build_default_adapter_registry(&nwpl_endpoints(&file_config));

    let db_path = args
        .db
        .clone()
        .or_else(|| file_config.database_path.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH));

    match args.command {
        Command::Fetch {
            number,
            pin,
            system,
        } => commands::run_fetch_command(&registry, &number, &pin, &system).await,
        Command::Sync { user } => {
            let store = open_store(&db_path).await?;
            commands::run_sync_command(&store, &registry, user.as_deref()).await
        }
        Command::User(command) => {
            commands::run_user_command(&open_store(&db_path).await?, command).await
        }
        Command::Card(command) => {
            commands::run_card_command(&open_store(&db_path).await?, command).await
        }
        Command::Book(command) => {
            commands::run_book_command(&open_store(&db_path).await?, command).await
        }
    }
}

async fn open_store(db_path: &Path) -> Result<Store> {
    debug!(path = %db_path.display(), "Opening database");
    let db = Database::new(db_path)
        .await
        .with_context(|| format!("Failed to open database '{}'", db_path.display()))?;
    Ok(Store::new(db))
}

fn nwpl_endpoints(config: &FileConfig) -> NwplEndpoints {
    let defaults = NwplEndpoints::default();
    NwplEndpoints {
        login_base_url: config
            .nwpl_login_base_url
            .clone()
            .unwrap_or(defaults.login_base_url),
        gateway_base_url: config
            .nwpl_gateway_base_url
            .clone()
            .unwrap_or(defaults.gateway_base_url),
        library_slug: defaults.library_slug,
    }
}
