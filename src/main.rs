//! Registry proxy binary.
//!
//! Loads configuration, compiles the route table, and serves until Ctrl-C.

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use registry_proxy::config::{load_config, ProxyConfig};
use registry_proxy::http::HttpServer;
use registry_proxy::lifecycle::Shutdown;
use registry_proxy::observability;

#[derive(Parser)]
#[command(name = "registry-proxy")]
#[command(about = "Reverse proxy for OCI/Docker container registries", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. Without one, the standard
    /// public-registry table is served with path-prefix routing.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    observability::logging::init(&config.observability);

    tracing::info!(
        bind_address = %config.listener.bind_address,
        strategy = ?config.routing.strategy,
        routes = config.routing.routes.len(),
        "configuration loaded"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(address = %local_addr, "listening for connections");

    let shutdown = Shutdown::new();
    shutdown.trigger_on_ctrl_c();

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("shutdown complete");
    Ok(())
}
