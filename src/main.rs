//! Foresight - project-management backend with task risk scoring
//!
//! Entry point for the HTTP server and the model-training CLI.

use anyhow::Context;
use clap::{Parser, Subcommand};
use foresight::{ApiServer, ApiServerConfig, AppState, RiskService, Settings, SqliteStore};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "foresight",
    version,
    about = "Project-management backend with ML-assisted task risk scoring"
)]
struct Cli {
    /// Config file path (defaults to foresight.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server (the default)
    Serve,
    /// Train the risk model on synthetic data and write the artifact
    Train {
        /// Output path for the artifact; defaults to the configured
        /// model_path
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(settings).await,
        Command::Train { output } => train(settings, output),
    }
}

async fn serve(settings: Settings) -> anyhow::Result<()> {
    let addr: SocketAddr = settings
        .listen_addr
        .parse()
        .with_context(|| format!("invalid listen address: {}", settings.listen_addr))?;

    let store = Arc::new(SqliteStore::open(&settings.database_path)?);
    let risk = Arc::new(RiskService::new(settings.model_path.clone()));

    if settings.api_token.is_none() {
        info!("No API token configured, serving without authentication");
    }

    let state = AppState {
        store,
        risk,
        api_token: settings.api_token,
    };

    ApiServer::new(ApiServerConfig { addr }, state).serve().await
}

fn train(settings: Settings, output: Option<PathBuf>) -> anyhow::Result<()> {
    let path = output.or(settings.model_path).context(
        "no artifact path: pass --output or set model_path in the configuration",
    )?;

    let service = RiskService::new(None);
    service.save(&path)?;
    info!("Model artifact written to {}", path.display());
    Ok(())
}
