mod address;
mod config;
mod extract;
mod pool;
mod server;
mod source;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::loader::ConfigLoader;
use crate::pool::ProxyPool;
use crate::server::ProxyServer;

#[derive(Parser)]
#[command(name = "proxy-rotator")]
#[command(about = "Hands out one proxy address per HTTP request from a rotating pool", long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();

    let cfg = ConfigLoader::load(&cli.config)?;
    let (source, ttl) = source::configure(&cfg)?;

    let pool = ProxyPool::new(source, ttl).await;
    tracing::info!("Pool primed with {} proxies", pool.available().await);

    ProxyServer::new(pool, cfg.proxy_type)
        .run(&cfg.listen_addr)
        .await
}
