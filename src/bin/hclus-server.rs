//! Hierarchical clustering server.
//!
//! ```bash
//! # Serve tables from ./data on port 2025
//! hclus-server 2025
//!
//! # With a config file (the positional port still wins)
//! hclus-server 2025 --config hclus.toml
//!
//! # Debug logging
//! RUST_LOG=hclus=debug hclus-server 2025
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use hclus::{Config, CsvDirectorySource, Server};

#[derive(Parser, Debug)]
#[command(name = "hclus-server", about = "Serve hierarchical clustering over TCP")]
struct Args {
    /// TCP port to listen on.
    port: u16,

    /// Optional TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn serve(config: Config) -> Result<()> {
    let source = Arc::new(CsvDirectorySource::new(&config.storage.data_dir));
    info!(data_dir = %config.storage.data_dir.display(), "serving tables");

    let server = Server::bind(&config, source)
        .await
        .with_context(|| format!("binding {}:{}", config.server.bind_address, config.server.port))?;

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match Config::from_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("hclus-server: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => Config::default(),
    };
    config.server.port = args.port;

    init_tracing(&config.logging.level);

    match serve(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
