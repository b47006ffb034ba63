//! Torii Gatewayr - Workspace-scoped catalogue gateway
//!
//! Mediates access to a geospatial resource catalogue and an ADES workflow
//! runner, enforcing workspace-level authorization on every request.

use clap::Parser;
use std::path::PathBuf;
use torii_gatewayr::{config::Config, server::Server};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Torii Gatewayr - Workspace-scoped catalogue and order gateway
#[derive(Parser, Debug)]
#[command(name = "torii-gatewayr")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting Torii Gatewayr v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = Config::load(&args.config)?;
    info!("Loaded configuration from {:?}", args.config);

    // Start server
    let server = Server::new(config).await?;
    server.run().await?;

    Ok(())
}
