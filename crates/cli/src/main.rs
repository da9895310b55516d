//! osindex CLI
//!
//! Main entry point for the osindex command-line tool.
//! Manages k-NN indices, bulk ingestion, metadata deletion and search
//! against an OpenSearch-compatible node.

mod commands;

use clap::{Parser, Subcommand};
use commands::{DeleteCommand, IndicesCommand, InsertCommand, PingCommand, SearchCommand};
use osindex_core::{config::AppConfig, logging};
use std::path::PathBuf;

/// osindex - vector index management and retrieval
#[derive(Parser, Debug)]
#[command(name = "osindex")]
#[command(about = "Vector index management and k-NN retrieval", long_about = None)]
#[command(version)]
struct Cli {
    /// Backend node URL
    #[arg(short, long, global = true, env = "OSINDEX_ENDPOINT")]
    endpoint: Option<String>,

    /// Path to config file
    #[arg(short, long, global = true, env = "OSINDEX_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Index lifecycle (list, create, ensure, drop, exists)
    Indices(IndicesCommand),

    /// Bulk-insert documents from an NDJSON file
    Insert(InsertCommand),

    /// Delete every chunk of a source file
    Delete(DeleteCommand),

    /// Free-text k-NN search over one or more indices
    Search(SearchCommand),

    /// Check that the backend is reachable
    Ping(PingCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_with(cli.config.as_deref())?.with_overrides(
        cli.endpoint,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;
    config.validate()?;

    tracing::info!("osindex CLI starting");
    tracing::debug!("Endpoint: {}", config.endpoint);
    tracing::debug!("Dimension: {}", config.dimension);

    let command_name = match &cli.command {
        Commands::Indices(_) => "indices",
        Commands::Insert(_) => "insert",
        Commands::Delete(_) => "delete",
        Commands::Search(_) => "search",
        Commands::Ping(_) => "ping",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Indices(cmd) => cmd.execute(&config).await,
        Commands::Insert(cmd) => cmd.execute(&config).await,
        Commands::Delete(cmd) => cmd.execute(&config).await,
        Commands::Search(cmd) => cmd.execute(&config).await,
        Commands::Ping(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {:#}", e),
    }

    result
}
