// ============================
// crates/backend-bin/src/main.rs
// ============================
use anyhow::Context;
use clap::Parser;
use std::{net::SocketAddr, path::PathBuf};
use tokio::net::TcpListener;
use userauth_lib::{config::DEFAULT_CONFIG_FILE, logging::init_logging, Settings};

mod error;
mod middleware;
mod routes;
mod state;

use state::AppState;

#[derive(Debug, Parser)]
#[command(version, about = "User registration and authentication service")]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Override the configured bind address
    #[arg(short, long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load_from(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(bind) = cli.bind {
        settings.bind_addr = bind;
    }

    init_logging(&settings).map_err(|e| anyhow::anyhow!("initializing logging: {e}"))?;

    let addr = settings.bind_addr;
    let state = AppState::open(settings)?;
    let app = routes::create_router(state);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app).await?;

    Ok(())
}
