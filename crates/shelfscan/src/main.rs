//! Shelfscan - turn shelf photos into inventory lists with a vision LLM.
//!
//! Shelfscan is a small HTTP service: upload a shelf photo to `/analyze` and
//! get back the products the model sees, normalized into a stable JSON shape
//! and optionally written to CSV.
//!
//! # Usage
//!
//! ```bash
//! # Serve on $PORT (default 8080)
//! OPENAI_API_KEY=sk-... shelfscan
//!
//! # Use the Responses API and export every result as CSV
//! shelfscan serve --style responses --export-csv
//!
//! # View configuration
//! shelfscan config show
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use shelfscan::{env, logging};

mod cli;

/// Shelfscan - shelf photo to inventory list.
#[derive(Parser, Debug)]
#[command(name = "shelfscan")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file (defaults to the platform config directory)
    #[arg(short, long, global = true, env = "SHELFSCAN_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP service (default)
    Serve(cli::serve::ServeArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logging isn't initialized yet, so use eprintln for startup warnings.
    // .env is read first so clap's env fallbacks see it too.
    if let Err(e) = env::load(None) {
        eprintln!("Warning: Failed to load .env: {e}");
    }
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => shelfscan_core::Config::load_from(path)?,
        None => match shelfscan_core::Config::load() {
            Ok(config) => config,
            Err(e) => {
                eprintln!(
                    "Warning: Failed to load config: {e}\n  \
                     Using default configuration. Check your config file with `shelfscan config path`."
                );
                shelfscan_core::Config::default()
            }
        },
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Shelfscan v{}", shelfscan_core::VERSION);

    match cli.command {
        Some(Commands::Serve(args)) => cli::serve::execute(args, config).await,
        None => cli::serve::execute(cli::serve::ServeArgs::default(), config).await,
        Some(Commands::Config(args)) => cli::config::execute(args, config, cli.config).await,
    }
}
