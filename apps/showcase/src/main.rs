use anyhow::Result;
use clap::Parser;
use vpb_bus::message_topic;
use vpb_showcase::{ShowcaseConfig, ShowcaseModerator};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ShowcaseConfig::parse();
    vpb_telemetry::install("vpb-showcase", env!("CARGO_PKG_VERSION"), config.broker.dev_logging)?;

    let moderator = ShowcaseModerator::new()?;
    let topic = message_topic(&config.channel_id);
    vpb_core::serve(&moderator, &config.broker.redis_options(), &topic).await?;
    Ok(())
}
