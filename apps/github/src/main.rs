use anyhow::Result;
use clap::Parser;
use vpb_github::GithubConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let config = GithubConfig::parse();
    vpb_telemetry::install("vpb-github", env!("CARGO_PKG_VERSION"), config.broker.dev_logging)?;
    vpb_github::run(config).await
}
