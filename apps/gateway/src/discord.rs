//! Serenity-backed implementation of the chat-platform boundary, plus the
//! event handler feeding the inbound relay.

use std::sync::Arc;

use serenity::all::{
    Channel, ChannelId, Context, CreateMessage, EditMessage, EventHandler, GatewayIntents, Http,
    Message, MessageId, Ready, UserId,
};
use serenity::async_trait;
use tracing::{debug, info, warn};
use vpb_core::{ChatPlatform, PlatformError};

use crate::lifecycle::{GatewayPhase, Lifecycle};
use crate::relay::{ChatMessageEvent, InboundRelay};

pub fn intents() -> GatewayIntents {
    GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
}

/// Parses a Discord snowflake. Zero is rejected since serenity ids are non-zero.
pub(crate) fn parse_id(kind: &'static str, value: &str) -> Result<u64, PlatformError> {
    value
        .parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .ok_or_else(|| PlatformError::InvalidId {
            kind,
            value: value.to_string(),
        })
}

fn channel(value: &str) -> Result<ChannelId, PlatformError> {
    parse_id("channel", value).map(ChannelId::new)
}

fn message(value: &str) -> Result<MessageId, PlatformError> {
    parse_id("message", value).map(MessageId::new)
}

pub struct SerenityPlatform {
    http: Arc<Http>,
}

impl SerenityPlatform {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ChatPlatform for SerenityPlatform {
    async fn send_message(
        &self,
        channel_id: &str,
        content: &str,
    ) -> Result<String, PlatformError> {
        let sent = channel(channel_id)?
            .send_message(&*self.http, CreateMessage::new().content(content))
            .await
            .map_err(PlatformError::request)?;
        Ok(sent.id.to_string())
    }

    async fn send_reply(
        &self,
        channel_id: &str,
        message_id: &str,
        content: &str,
    ) -> Result<String, PlatformError> {
        let target = channel(channel_id)?;
        let builder = CreateMessage::new()
            .content(content)
            .reference_message((target, message(message_id)?));
        let sent = target
            .send_message(&*self.http, builder)
            .await
            .map_err(PlatformError::request)?;
        Ok(sent.id.to_string())
    }

    async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        content: &str,
    ) -> Result<(), PlatformError> {
        channel(channel_id)?
            .edit_message(
                &*self.http,
                message(message_id)?,
                EditMessage::new().content(content),
            )
            .await
            .map_err(PlatformError::request)?;
        Ok(())
    }

    async fn delete_message(
        &self,
        channel_id: &str,
        message_id: &str,
        reason: &str,
    ) -> Result<(), PlatformError> {
        let reason = Some(reason).filter(|r| !r.is_empty());
        self.http
            .delete_message(channel(channel_id)?, message(message_id)?, reason)
            .await
            .map_err(PlatformError::request)
    }

    async fn create_dm_channel(&self, user_id: &str) -> Result<String, PlatformError> {
        let dm = UserId::new(parse_id("user", user_id)?)
            .create_dm_channel(&*self.http)
            .await
            .map_err(PlatformError::request)?;
        Ok(dm.id.to_string())
    }
}

/// Feeds message events into the relay and marks the gateway connected once
/// Discord reports ready.
pub struct DiscordHandler {
    relay: Arc<InboundRelay>,
    lifecycle: Lifecycle,
}

impl DiscordHandler {
    pub fn new(relay: Arc<InboundRelay>, lifecycle: Lifecycle) -> Self {
        Self { relay, lifecycle }
    }
}

#[async_trait]
impl EventHandler for DiscordHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        self.relay.set_bot_user_id(ready.user.id.to_string());
        if let Err(err) = self.lifecycle.advance(GatewayPhase::Connected) {
            warn!(error = %err, "ready received outside of connecting phase");
        }
        info!(
            bot_user = %ready.user.name,
            bot_id = %ready.user.id,
            guilds = ready.guilds.len(),
            "connected to discord"
        );
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if self.lifecycle.phase().is_stopping() {
            return;
        }
        if self.relay.bot_user_id().is_none() {
            // The cache has applied READY before any handler task runs.
            let bot_id = ctx.cache.current_user().id.to_string();
            self.relay.set_bot_user_id(bot_id);
        }

        let is_thread = match msg.channel(&ctx).await {
            Ok(Channel::Guild(gc)) => gc.thread_metadata.is_some(),
            Ok(_) => false,
            Err(err) => {
                debug!(channel_id = %msg.channel_id, error = %err, "channel lookup failed");
                false
            }
        };

        let event = ChatMessageEvent {
            message_id: msg.id.to_string(),
            channel_id: msg.channel_id.to_string(),
            author_id: msg.author.id.to_string(),
            has_attachments_or_embeds: !msg.attachments.is_empty() || !msg.embeds.is_empty(),
            content: msg.content,
            is_thread,
        };
        self.relay.relay(event).await;
    }
}
