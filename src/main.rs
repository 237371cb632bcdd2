use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use rolegate::config::{load_config, GatewayConfig};

/// Role-checking gateway in front of an identity provider
#[derive(Debug, Parser)]
#[command(name = "rolegate", version, about)]
struct Args {
    /// TOML configuration file; ROLEGATE_* environment variables are used when absent
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listen address
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rolegate=info"));
    fmt().with_env_filter(filter).init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path).with_context(|| format!("loading {}", path.display()))?,
        None => GatewayConfig::from_env().context("reading ROLEGATE_* environment")?,
    };
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }

    tracing::info!(
        "Starting rolegate for {} ({} protected routes)",
        config.provider.domain,
        config.routes.len()
    );
    rolegate::server::serve(config).await?;
    Ok(())
}
