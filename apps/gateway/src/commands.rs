use std::future::Future;
use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, error, info, trace, warn};
use vpb_bus::MessageStream;
use vpb_core::{ChatPlatform, CommandEnvelope, CommandKind, CommandTopicPayload, PlatformError};
use vpb_telemetry::metrics::COMMAND_TOTAL;

use crate::outbound::DrainStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Deleted,
    /// Unrecognised command type; nothing was done.
    Ignored(u32),
}

pub struct CommandExecutor {
    platform: Arc<dyn ChatPlatform>,
}

impl CommandExecutor {
    pub fn new(platform: Arc<dyn ChatPlatform>) -> Self {
        Self { platform }
    }

    pub async fn execute(&self, cmd: &CommandEnvelope) -> Result<CommandOutcome, PlatformError> {
        match cmd.kind {
            CommandKind::DeleteMessage => {
                self.platform
                    .delete_message(&cmd.channel_id, &cmd.message_id, &cmd.reason)
                    .await?;
                Ok(CommandOutcome::Deleted)
            }
            CommandKind::Unknown(kind) => Ok(CommandOutcome::Ignored(kind)),
        }
    }
}

/// Consumes `discord.cmd`. Chat messages that share the topic are skipped.
pub async fn run_command_drain<S>(
    executor: CommandExecutor,
    mut messages: MessageStream,
    shutdown: S,
) -> DrainStats
where
    S: Future<Output = ()>,
{
    let mut stats = DrainStats::default();
    tokio::pin!(shutdown);
    info!("command drain started");

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

        let cmd = match vpb_core::decode::<CommandTopicPayload>(&msg.payload) {
            Ok(CommandTopicPayload::Directive(cmd)) => cmd,
            Ok(CommandTopicPayload::Chat(chat)) => {
                trace!(message_id = %chat.message_id, "chat command is not a gateway directive");
                continue;
            }
            Err(err) => {
                stats.malformed += 1;
                warn!(topic = %msg.topic, error = %err, "dropping malformed command");
                continue;
            }
        };

        vpb_telemetry::record_counter(COMMAND_TOTAL, "kind", cmd.kind.as_str());
        match executor.execute(&cmd).await {
            Ok(CommandOutcome::Deleted) => {
                stats.handled += 1;
                debug!(
                    channel_id = %cmd.channel_id,
                    message_id = %cmd.message_id,
                    reason = %cmd.reason,
                    "message deleted"
                );
            }
            Ok(CommandOutcome::Ignored(kind)) => {
                stats.failed += 1;
                error!(
                    kind,
                    channel_id = %cmd.channel_id,
                    message_id = %cmd.message_id,
                    "unknown command type"
                );
            }
            Err(err) => {
                stats.failed += 1;
                error!(
                    kind = cmd.kind.as_str(),
                    channel_id = %cmd.channel_id,
                    message_id = %cmd.message_id,
                    error = %err,
                    "command failed"
                );
            }
        }
    }

    info!(?stats, "command drain stopped");
    stats
}
