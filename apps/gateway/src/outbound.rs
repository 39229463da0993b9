//! Executes [`OutboundEnvelope`]s published on `discord.out`.
//!
//! Dispatch priority is DM, then reply, then internal-id upsert, then plain
//! send. Only the upsert branch touches the correlation store: a hit edits the
//! stored message, a miss sends a new one and records its id.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use vpb_bus::MessageStream;
use vpb_core::{ChatPlatform, OutboundEnvelope, PlatformError, decode};
use vpb_correlation::SharedCorrelationStore;
use vpb_telemetry::metrics::{OUTBOUND_FAILED, OUTBOUND_TOTAL};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchAction {
    DirectMessage {
        channel_id: String,
        message_id: String,
    },
    Replied {
        message_id: String,
    },
    /// Correlation hit: the stored message was edited.
    Edited {
        message_id: String,
    },
    /// Correlation miss: a new message was sent and recorded.
    Created {
        message_id: String,
    },
    Sent {
        message_id: String,
    },
}

impl DispatchAction {
    pub fn label(&self) -> &'static str {
        match self {
            DispatchAction::DirectMessage { .. } => "direct_message",
            DispatchAction::Replied { .. } => "reply",
            DispatchAction::Edited { .. } => "edit",
            DispatchAction::Created { .. } => "create",
            DispatchAction::Sent { .. } => "send",
        }
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

pub struct OutboundDispatcher {
    platform: Arc<dyn ChatPlatform>,
    correlation: SharedCorrelationStore,
    ttl: Duration,
}

impl OutboundDispatcher {
    pub fn new(
        platform: Arc<dyn ChatPlatform>,
        correlation: SharedCorrelationStore,
        ttl: Duration,
    ) -> Self {
        Self {
            platform,
            correlation,
            ttl,
        }
    }

    pub async fn dispatch(&self, env: &OutboundEnvelope) -> Result<DispatchAction, DispatchError> {
        if env.is_direct_message {
            let channel_id = self.platform.create_dm_channel(&env.user_id).await?;
            let message_id = self.platform.send_message(&channel_id, &env.content).await?;
            return Ok(DispatchAction::DirectMessage {
                channel_id,
                message_id,
            });
        }

        if let Some(reply_to) = env.reply_target() {
            let message_id = self
                .platform
                .send_reply(&env.channel_id, reply_to, &env.content)
                .await?;
            return Ok(DispatchAction::Replied { message_id });
        }

        if let Some(internal_id) = env.correlation_key() {
            return self.upsert(internal_id, env).await;
        }

        let message_id = self
            .platform
            .send_message(&env.channel_id, &env.content)
            .await?;
        Ok(DispatchAction::Sent { message_id })
    }

    async fn upsert(
        &self,
        internal_id: &str,
        env: &OutboundEnvelope,
    ) -> Result<DispatchAction, DispatchError> {
        let existing = match self.correlation.get(internal_id).await {
            Ok(existing) => existing,
            Err(err) => {
                warn!(
                    internal_id,
                    error = %err,
                    "correlation lookup failed; sending new message"
                );
                None
            }
        };

        if let Some(message_id) = existing {
            self.platform
                .edit_message(&env.channel_id, &message_id, &env.content)
                .await?;
            return Ok(DispatchAction::Edited { message_id });
        }

        let message_id = self
            .platform
            .send_message(&env.channel_id, &env.content)
            .await?;
        if let Err(err) = self.correlation.put(internal_id, &message_id, self.ttl).await {
            warn!(
                internal_id,
                message_id = %message_id,
                error = %err,
                "failed to record correlation; next publish will send again"
            );
        }
        Ok(DispatchAction::Created { message_id })
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainStats {
    pub handled: u64,
    pub failed: u64,
    pub malformed: u64,
    /// The subscription ended before shutdown was requested.
    pub stream_closed: bool,
}

/// Consumes `discord.out` until the stream ends or `shutdown` resolves. One
/// envelope is processed at a time, which keeps correlation lookups and writes
/// for the same internal id strictly ordered.
pub async fn run_outbound_drain<S>(
    dispatcher: OutboundDispatcher,
    mut messages: MessageStream,
    shutdown: S,
) -> DrainStats
where
    S: Future<Output = ()>,
{
    let mut stats = DrainStats::default();
    tokio::pin!(shutdown);
    info!("outbound drain started");

    loop {
        let msg = tokio::select! {
            biased;
            _ = &mut shutdown => break,
            next = messages.next() => match next {
                Some(msg) => msg,
                None => {
                    stats.stream_closed = true;
                    break;
                }
            },
        };

        let env: OutboundEnvelope = match decode(&msg.payload) {
            Ok(env) => env,
            Err(err) => {
                stats.malformed += 1;
                warn!(
                    topic = %msg.topic,
                    error = %err,
                    "dropping malformed outbound envelope"
                );
                continue;
            }
        };

        match dispatcher.dispatch(&env).await {
            Ok(action) => {
                stats.handled += 1;
                vpb_telemetry::record_counter(OUTBOUND_TOTAL, "action", action.label());
                debug!(
                    channel_id = %env.channel_id,
                    internal_id = env.internal_id.as_deref().unwrap_or_default(),
                    ?action,
                    "outbound envelope dispatched"
                );
            }
            Err(err) => {
                stats.failed += 1;
                vpb_telemetry::record_counter(OUTBOUND_FAILED, "action", "dispatch");
                error!(
                    channel_id = %env.channel_id,
                    user_id = %env.user_id,
                    internal_id = env.internal_id.as_deref().unwrap_or_default(),
                    error = %err,
                    "outbound envelope dropped"
                );
            }
        }
    }

    info!(?stats, "outbound drain stopped");
    stats
}
