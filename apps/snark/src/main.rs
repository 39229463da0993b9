use anyhow::Result;
use clap::Parser;
use vpb_bus::message_topic;
use vpb_snark::{Snark, SnarkConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let config = SnarkConfig::parse();
    vpb_telemetry::install("vpb-snark", env!("CARGO_PKG_VERSION"), config.broker.dev_logging)?;

    let snark = Snark::new()?;
    let topic = message_topic(&config.channel_id);
    vpb_core::serve(&snark, &config.broker.redis_options(), &topic).await?;
    Ok(())
}
