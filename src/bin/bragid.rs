//! bragid: the Bragi daemon.
//!
//! Serves the translation proxy and cache admin endpoints over HTTP.

use std::net::SocketAddr;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bragi::BragiError;
use bragi::server::config::Config;
use bragi::server::{build_state, router};

/// Bragi daemon, a caching translation proxy.
#[derive(Parser)]
#[command(name = "bragid")]
#[command(version = bragi::PKG_VERSION)]
#[command(about = "Bragi caching translation proxy")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Override the listen address from the config file.
    #[arg(short, long, env = "BRAGI_ADDRESS")]
    address: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    // Load configuration
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(address) = args.address {
        config.server.address = address;
    }

    // Parse address
    let addr: SocketAddr = config
        .server
        .address
        .parse()
        .map_err(|e| BragiError::Configuration(format!("Invalid address: {e}")))?;

    let state = build_state(&config)?;
    let listener = TcpListener::bind(addr).await?;

    info!(
        version = bragi::PKG_VERSION,
        %addr,
        cache = state.gateway.store().kind().label(),
        model = state.gateway.model(),
        "bragid starting"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("bragid stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}
