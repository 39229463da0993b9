use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use serenity::Client;
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info, warn};
use vpb_bus::{BrokerTransport, COMMAND_TOPIC, OUTBOUND_TOPIC, RedisBroker};
use vpb_core::{ChatPlatform, shutdown_signal};
use vpb_correlation::RedisCorrelationStore;

use crate::commands::{CommandExecutor, run_command_drain};
use crate::config::GatewayConfig;
use crate::discord::{DiscordHandler, SerenityPlatform, intents};
use crate::lifecycle::{GatewayPhase, Lifecycle};
use crate::outbound::{DrainStats, OutboundDispatcher, run_outbound_drain};
use crate::relay::InboundRelay;

/// Runs the gateway until a termination signal arrives, the Discord
/// connection fails or one of the drains loses its subscription.
pub async fn run(config: GatewayConfig) -> Result<()> {
    let lifecycle = Lifecycle::new();
    let redis = config.broker.redis_options();

    let publisher = RedisBroker::connect(&redis)
        .await
        .context("connect publishing broker client")?;
    let mut outbound_bus = RedisBroker::connect(&redis)
        .await
        .context("connect outbound broker client")?;
    let mut command_bus = RedisBroker::connect(&redis)
        .await
        .context("connect command broker client")?;
    let correlation = RedisCorrelationStore::connect(&redis.url())
        .await
        .context("connect correlation store")?;

    lifecycle.advance(GatewayPhase::Connecting)?;

    let outbound_stream = outbound_bus.subscribe(OUTBOUND_TOPIC).await?;
    let command_stream = command_bus.subscribe(COMMAND_TOPIC).await?;

    let relay = Arc::new(InboundRelay::new(publisher));
    let handler = DiscordHandler::new(relay.clone(), lifecycle.clone());
    let mut client = Client::builder(&config.token, intents())
        .event_handler(handler)
        .await
        .context("build discord client")?;

    let platform: Arc<dyn ChatPlatform> = Arc::new(SerenityPlatform::new(client.http.clone()));
    let dispatcher = OutboundDispatcher::new(
        platform.clone(),
        Arc::new(correlation),
        config.correlation_ttl(),
    );
    let executor = CommandExecutor::new(platform);

    let mut outbound_task = tokio::spawn(run_outbound_drain(
        dispatcher,
        outbound_stream,
        lifecycle.until_shutdown(),
    ));
    let mut command_task = tokio::spawn(run_command_drain(
        executor,
        command_stream,
        lifecycle.until_shutdown(),
    ));

    let shard_manager = client.shard_manager.clone();
    let mut discord_task = tokio::spawn(async move { client.start().await });

    let Supervised {
        result: connection_result,
        outbound: outbound_joined,
        command: command_joined,
    } = supervise(
        shutdown_signal(),
        &mut discord_task,
        &mut outbound_task,
        &mut command_task,
    )
    .await;
    if let Err(err) = &connection_result {
        error!(error = %err, "gateway stopping");
    }

    lifecycle.advance(GatewayPhase::ShuttingDown)?;
    shard_manager.shutdown_all().await;
    if !discord_task.is_finished() {
        if let Err(err) = discord_task.await {
            warn!(error = %err, "discord task did not stop cleanly");
        }
    }

    let outbound = match outbound_joined {
        Some(joined) => joined,
        None => outbound_task.await,
    };
    let command = match command_joined {
        Some(joined) => joined,
        None => command_task.await,
    };
    report_drain("outbound", outbound);
    report_drain("command", command);

    if let Err(err) = relay.close().await {
        warn!(client = "publisher", error = %err, "failed to close broker client");
    }
    for (name, bus) in [("outbound", &mut outbound_bus), ("command", &mut command_bus)] {
        if let Err(err) = bus.close().await {
            warn!(client = name, error = %err, "failed to close broker client");
        }
    }

    lifecycle.advance(GatewayPhase::Closed)?;
    connection_result
}

fn report_drain(name: &'static str, joined: Result<DrainStats, JoinError>) {
    match joined {
        Ok(stats) if stats.stream_closed => {
            error!(drain = name, ?stats, "drain lost its subscription")
        }
        Ok(stats) => info!(drain = name, ?stats, "drain finished"),
        Err(err) => error!(drain = name, error = %err, "drain task failed"),
    }
}

/// How the gateway's first task to finish ended, plus any drain result the
/// wait already consumed.
pub(crate) struct Supervised {
    pub result: Result<()>,
    pub outbound: Option<Result<DrainStats, JoinError>>,
    pub command: Option<Result<DrainStats, JoinError>>,
}

/// Waits for a termination signal or for any long-running task to end.
/// Anything but the signal is an error: the drains only stop on their own
/// when their subscription is gone.
pub(crate) async fn supervise<S>(
    shutdown: S,
    discord: &mut JoinHandle<serenity::Result<()>>,
    outbound: &mut JoinHandle<DrainStats>,
    command: &mut JoinHandle<DrainStats>,
) -> Supervised
where
    S: Future<Output = ()>,
{
    let mut outbound_joined = None;
    let mut command_joined = None;
    let result = tokio::select! {
        _ = shutdown => Ok(()),
        joined = discord => match joined {
            Ok(Ok(())) => Err(anyhow!("discord connection ended unexpectedly")),
            Ok(Err(err)) => Err(anyhow!(err).context("discord connection failed")),
            Err(err) => Err(anyhow!(err).context("discord task panicked")),
        },
        joined = outbound => {
            outbound_joined = Some(joined);
            Err(anyhow!("outbound drain ended before shutdown"))
        }
        joined = command => {
            command_joined = Some(joined);
            Err(anyhow!("command drain ended before shutdown"))
        }
    };
    Supervised {
        result,
        outbound: outbound_joined,
        command: command_joined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::pending;

    fn idle_discord() -> JoinHandle<serenity::Result<()>> {
        tokio::spawn(pending())
    }

    fn idle_drain() -> JoinHandle<DrainStats> {
        tokio::spawn(pending())
    }

    #[tokio::test]
    async fn a_drain_losing_its_subscription_stops_the_gateway() {
        let mut discord = idle_discord();
        let mut outbound = tokio::spawn(async {
            DrainStats {
                stream_closed: true,
                ..DrainStats::default()
            }
        });
        let mut command = idle_drain();

        let exit = supervise(pending(), &mut discord, &mut outbound, &mut command).await;

        let err = exit.result.unwrap_err();
        assert!(err.to_string().contains("outbound drain ended"));
        assert!(exit.outbound.unwrap().unwrap().stream_closed);
        assert!(exit.command.is_none());
        discord.abort();
        command.abort();
    }

    #[tokio::test]
    async fn command_drain_ending_is_fatal_too() {
        let mut discord = idle_discord();
        let mut outbound = idle_drain();
        let mut command = tokio::spawn(async { DrainStats::default() });

        let exit = supervise(pending(), &mut discord, &mut outbound, &mut command).await;

        assert!(exit.result.is_err());
        assert!(exit.command.is_some());
        discord.abort();
        outbound.abort();
    }

    #[tokio::test]
    async fn signal_is_a_clean_stop() {
        let mut discord = idle_discord();
        let mut outbound = idle_drain();
        let mut command = idle_drain();

        let exit = supervise(async {}, &mut discord, &mut outbound, &mut command).await;

        assert!(exit.result.is_ok());
        assert!(exit.outbound.is_none() && exit.command.is_none());
        for task in [outbound, command] {
            task.abort();
        }
        discord.abort();
    }
}
