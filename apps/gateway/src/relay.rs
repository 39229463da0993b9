use std::sync::OnceLock;

use tokio::sync::RwLock;
use tracing::{debug, error, trace, warn};
use vpb_bus::{BrokerTransport, BusError, COMMAND_TOPIC, message_topic};
use vpb_core::InboundEnvelope;
use vpb_telemetry::metrics::{RELAY_PUBLISHED, RELAY_SKIPPED};

/// The parts of a chat message event the relay needs, detached from the
/// Discord model so the relay can be driven without a live connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessageEvent {
    pub message_id: String,
    pub channel_id: String,
    pub author_id: String,
    pub content: String,
    pub has_attachments_or_embeds: bool,
    pub is_thread: bool,
}

impl From<ChatMessageEvent> for InboundEnvelope {
    fn from(event: ChatMessageEvent) -> Self {
        InboundEnvelope {
            message_id: event.message_id,
            channel_id: event.channel_id,
            user_id: event.author_id,
            content: event.content,
            has_attachments_or_embeds: event.has_attachments_or_embeds,
            is_thread: event.is_thread,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    Published { topic: String },
    SkippedOwnMessage,
    /// The bot's own id is not known yet, so the author cannot be checked.
    SkippedBeforeReady,
    PublishFailed { topic: String },
}

/// Republishes chat events onto the broker. Owns its publishing client,
/// which stays usable until [`InboundRelay::close`].
pub struct InboundRelay {
    bus: RwLock<Box<dyn BrokerTransport>>,
    bot_user_id: OnceLock<String>,
}

impl InboundRelay {
    pub fn new(bus: impl BrokerTransport + 'static) -> Self {
        Self {
            bus: RwLock::new(Box::new(bus)),
            bot_user_id: OnceLock::new(),
        }
    }

    /// Releases the publishing client. Later relays fail with a logged
    /// publish error.
    pub async fn close(&self) -> Result<(), BusError> {
        self.bus.write().await.close().await?;
        debug!("inbound relay publisher closed");
        Ok(())
    }

    /// Records the bot's own user id. Later calls are ignored.
    pub fn set_bot_user_id(&self, id: impl Into<String>) {
        let id = id.into();
        if self.bot_user_id.set(id.clone()).is_err() {
            trace!(user_id = %id, "bot user id already known");
        }
    }

    pub fn bot_user_id(&self) -> Option<&str> {
        self.bot_user_id.get().map(String::as_str)
    }

    /// `discord.cmd` for `!`-prefixed content, else the source channel's topic.
    pub fn route_topic(envelope: &InboundEnvelope) -> String {
        if envelope.is_command() {
            COMMAND_TOPIC.to_string()
        } else {
            message_topic(&envelope.channel_id)
        }
    }

    pub async fn relay(&self, event: ChatMessageEvent) -> RelayOutcome {
        match self.bot_user_id() {
            Some(bot) if bot == event.author_id => {
                trace!(message_id = %event.message_id, "skipping own message");
                vpb_telemetry::record_counter(RELAY_SKIPPED, "reason", "own_message");
                return RelayOutcome::SkippedOwnMessage;
            }
            Some(_) => {}
            None => {
                warn!(
                    message_id = %event.message_id,
                    channel_id = %event.channel_id,
                    "bot user id unknown; dropping message"
                );
                vpb_telemetry::record_counter(RELAY_SKIPPED, "reason", "before_ready");
                return RelayOutcome::SkippedBeforeReady;
            }
        }

        let envelope = InboundEnvelope::from(event);
        let topic = Self::route_topic(&envelope);
        let kind = if envelope.is_command() { "command" } else { "channel" };

        let published = {
            let bus = self.bus.read().await;
            vpb_bus::publish(&**bus, &topic, &envelope).await
        };
        match published {
            Ok(()) => {
                trace!(%topic, message_id = %envelope.message_id, "relayed inbound message");
                vpb_telemetry::record_counter(RELAY_PUBLISHED, "topic_kind", kind);
                RelayOutcome::Published { topic }
            }
            Err(err) => {
                error!(
                    %topic,
                    channel_id = %envelope.channel_id,
                    message_id = %envelope.message_id,
                    error = %err,
                    "failed to publish inbound message"
                );
                RelayOutcome::PublishFailed { topic }
            }
        }
    }
}
