use anyhow::Result;
use clap::Parser;
use vpb_gateway::GatewayConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let config = GatewayConfig::parse();
    vpb_telemetry::install("vpb-gateway", env!("CARGO_PKG_VERSION"), config.broker.dev_logging)?;
    vpb_gateway::run(config).await
}
