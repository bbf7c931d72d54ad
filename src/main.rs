use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use storage_engine::{gateway, Config};
use tracing_subscriber::EnvFilter;

/// Single-directory document store with document-server callbacks.
#[derive(Debug, Parser)]
#[command(name = "storage-engine", version, about)]
struct Cli {
    /// Path to config.toml (defaults to the per-user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Directory holding stored documents
    #[arg(long)]
    storage_dir: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(dir) = cli.storage_dir {
        config.storage.root = dir;
    }

    gateway::run(config).await
}
