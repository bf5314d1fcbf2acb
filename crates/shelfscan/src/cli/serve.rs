//! The `shelfscan serve` command: run the HTTP service.

use anyhow::Context;
use clap::Args;
use shelfscan::server::{self, AppState};
use shelfscan_core::{Analyzer, CallStyle, Config};

/// Arguments for the `serve` command.
#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Port to listen on (overrides config and $PORT)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Upstream call style: chat_schema, responses, chat_json_object
    #[arg(long, value_parser = parse_style)]
    pub style: Option<CallStyle>,

    /// Model name override
    #[arg(long)]
    pub model: Option<String>,

    /// Write a CSV file for every successful analysis
    #[arg(long)]
    pub export_csv: bool,
}

fn parse_style(s: &str) -> Result<CallStyle, String> {
    CallStyle::parse(s)
        .ok_or_else(|| format!("unknown style '{s}' (chat_schema, responses, chat_json_object)"))
}

/// Execute the serve command.
pub async fn execute(args: ServeArgs, mut config: Config) -> anyhow::Result<()> {
    config
        .apply_env()
        .context("Invalid environment configuration")?;

    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(style) = args.style {
        config.llm.style = style;
    }
    if let Some(model) = args.model {
        config.llm.model = model;
    }
    if args.export_csv {
        config.export.enabled = true;
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let style = config.llm.style;
    let export = config.export.enabled.then(|| config.export_dir());

    let analyzer = Analyzer::from_config(config);
    let app = server::router(AppState::new(analyzer));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    tracing::info!(%style, export_dir = ?export, "Shelfscan listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    tracing::info!("Shelfscan stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
