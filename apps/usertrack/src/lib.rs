//! Weekly member count report. Each run stores this week's count for the
//! guild owning the report channel, then posts a comparison with last week
//! and a graph of recent weeks through the gateway.

pub mod members;
pub mod report;
pub mod store;
pub mod week;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use vpb_bus::{BrokerTransport, OUTBOUND_TOPIC, RedisBroker};
use vpb_core::{BrokerArgs, OutboundEnvelope};

pub use members::{DiscordMemberCounts, GuildMembers, MemberCountError, MemberCountSource};
pub use report::{count_report, growth_graph};
pub use store::{StoreError, UserTrackStore, WeeklyCount};
pub use week::IsoWeek;

#[derive(Debug, Clone, Parser)]
#[command(name = "vpb-usertrack", about = "Posts the weekly member count report")]
pub struct UsertrackConfig {
    #[command(flatten)]
    pub broker: BrokerArgs,

    /// The ID of the channel the report is posted to.
    #[arg(long)]
    pub channel_id: String,

    /// Bot token for the Discord REST API.
    #[arg(long, env = "DISCORD_TOKEN", hide_env_values = true)]
    pub token: String,

    /// SQLite file holding the weekly samples.
    #[arg(long, default_value = "usertrack.sqlite3")]
    pub db_path: PathBuf,
}

/// What one run stored and posted.
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyReport {
    pub guild_id: String,
    pub sample: WeeklyCount,
    pub previous: Option<i64>,
    pub graph_published: bool,
}

/// Records this week's count and publishes the count message followed by the
/// growth graph. A failure to build or publish the graph is logged and does
/// not fail the run.
pub async fn publish_weekly_report(
    source: &dyn MemberCountSource,
    store: &UserTrackStore,
    bus: &dyn BrokerTransport,
    channel_id: &str,
    week: IsoWeek,
) -> Result<WeeklyReport> {
    let members = source
        .members_of(channel_id)
        .await
        .context("fetch member count")?;
    let sample = WeeklyCount {
        week,
        count: members.count,
    };

    store
        .record(&members.guild_id, sample)
        .await
        .context("store member count")?;
    let previous = store
        .count_for(&members.guild_id, week.previous())
        .await
        .context("query previous week")?;

    let summary =
        OutboundEnvelope::message(channel_id, count_report(week, sample.count, previous));
    vpb_bus::publish(bus, OUTBOUND_TOPIC, &summary)
        .await
        .context("publish member count")?;
    info!(
        guild_id = %members.guild_id,
        count = sample.count,
        week = %week,
        "posted member count"
    );

    let graph_published = match store.history(&members.guild_id).await {
        Ok(history) => {
            let graph = OutboundEnvelope::message(channel_id, growth_graph(&history));
            match vpb_bus::publish(bus, OUTBOUND_TOPIC, &graph).await {
                Ok(()) => true,
                Err(err) => {
                    error!(error = %err, "failed to publish member graph");
                    false
                }
            }
        }
        Err(err) => {
            error!(error = %err, "couldn't retrieve member history");
            false
        }
    };

    Ok(WeeklyReport {
        guild_id: members.guild_id,
        sample,
        previous,
        graph_published,
    })
}

pub async fn run(config: UsertrackConfig) -> Result<()> {
    let mut bus = RedisBroker::connect(&config.broker.redis_options())
        .await
        .context("connect broker client")?;
    let store = UserTrackStore::open(&config.db_path)
        .with_context(|| format!("open {}", config.db_path.display()))?;
    let source = DiscordMemberCounts::new(&config.token);

    let outcome =
        publish_weekly_report(&source, &store, &bus, &config.channel_id, IsoWeek::current()).await;
    if let Err(err) = bus.close().await {
        error!(error = %err, "failed to close broker client");
    }
    outcome.map(|_| ())
}
