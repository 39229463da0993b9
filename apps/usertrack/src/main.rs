use anyhow::Result;
use clap::Parser;
use vpb_usertrack::UsertrackConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let config = UsertrackConfig::parse();
    vpb_telemetry::install("vpb-usertrack", env!("CARGO_PKG_VERSION"), config.broker.dev_logging)?;
    vpb_usertrack::run(config).await
}
