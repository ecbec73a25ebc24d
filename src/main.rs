use anyhow::Result;
use clap::Parser;
use parley::cli::{self, Cli};
use parley::Config;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("{} starting", cfg.service.name);

    cli::run(cli, cfg).await
}
