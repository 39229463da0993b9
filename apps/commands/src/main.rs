use anyhow::Result;
use clap::Parser;
use vpb_bus::COMMAND_TOPIC;
use vpb_commands::{ChatCommandWorker, CommandsConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let config = CommandsConfig::parse();
    vpb_telemetry::install("vpb-commands", env!("CARGO_PKG_VERSION"), config.broker.dev_logging)?;

    let worker = ChatCommandWorker::new()?;
    vpb_core::serve(&worker, &config.broker.redis_options(), COMMAND_TOPIC).await?;
    Ok(())
}
