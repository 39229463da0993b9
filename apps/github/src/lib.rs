//! GitHub `check_run` webhook receiver. Each failing job on the watched branch
//! is added to its suite's ledger and the suite's status message is upserted
//! through the gateway.

pub mod config;
pub mod http;
pub mod ledger;
pub mod payload;
pub mod signature;

use std::sync::Arc;

use anyhow::{Context, Result};
use redis::aio::ConnectionManager;
use tracing::info;
use vpb_bus::{BrokerTransport, RedisBroker};

pub use config::GithubConfig;
pub use http::{WebhookState, build_router, failure_report};
pub use ledger::{
    FAILED_JOB_TTL, FailedJobLedger, InMemoryFailedJobLedger, LedgerError, RedisFailedJobLedger,
};

pub async fn run(config: GithubConfig) -> Result<()> {
    let redis = config.broker.redis_options();
    let bus = RedisBroker::connect(&redis)
        .await
        .context("connect broker client")?;
    let client = redis::Client::open(redis.url()).context("redis url")?;
    let connection = ConnectionManager::new(client)
        .await
        .context("connect failed-job ledger")?;

    let bus: Arc<dyn BrokerTransport> = Arc::new(bus);
    let state = WebhookState {
        bus,
        ledger: Arc::new(RedisFailedJobLedger::new(connection, FAILED_JOB_TTL)),
        channel_id: config.channel_id.clone(),
        role_id: config.role_id.clone(),
        branch: config.branch.clone(),
        webhook_secret: config.webhook_secret.clone().filter(|s| !s.is_empty()),
    };
    if state.webhook_secret.is_none() {
        tracing::warn!("no webhook secret configured; accepting unsigned payloads");
    }

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    info!(%addr, channel_id = %config.channel_id, "github webhook listener running");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(vpb_core::shutdown_signal())
        .await
        .context("http server")?;
    Ok(())
}
