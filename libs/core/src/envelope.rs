//! Wire types exchanged over the broker.
//!
//! Every envelope is a camelCase JSON object. Inbound envelopes are produced by
//! the gateway, outbound and command envelopes by feature workers.

use bytes::Bytes;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;

/// Prefix that routes a chat message onto the command topic.
pub const COMMAND_PREFIX: char = '!';

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// A chat message as seen by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundEnvelope {
    pub message_id: String,
    pub channel_id: String,
    pub user_id: String,
    pub content: String,
    #[serde(default)]
    pub has_attachments_or_embeds: bool,
    #[serde(default)]
    pub is_thread: bool,
}

impl InboundEnvelope {
    pub fn is_command(&self) -> bool {
        self.content.starts_with(COMMAND_PREFIX)
    }
}

/// A send, reply, DM or upsert request for the gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_id: Option<String>,
    #[serde(default)]
    pub is_direct_message: bool,
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub user_id: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_message_id: Option<String>,
}

impl OutboundEnvelope {
    /// Plain message into `channel_id`.
    pub fn message(channel_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    /// Direct message to `user_id`.
    pub fn direct(user_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            is_direct_message: true,
            user_id: user_id.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    /// Threaded reply to `message_id` in `channel_id`.
    pub fn reply(
        channel_id: impl Into<String>,
        message_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            reply_to_message_id: Some(message_id.into()),
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_internal_id(mut self, internal_id: impl Into<String>) -> Self {
        self.internal_id = Some(internal_id.into());
        self
    }

    /// The internal id used for edit-or-create, if any. Empty ids do not correlate.
    pub fn correlation_key(&self) -> Option<&str> {
        self.internal_id.as_deref().filter(|id| !id.is_empty())
    }

    pub fn reply_target(&self) -> Option<&str> {
        self.reply_to_message_id
            .as_deref()
            .filter(|id| !id.is_empty())
    }
}

/// Administrative command kinds. Values outside the known set survive decoding
/// as [`CommandKind::Unknown`] so that newer workers cannot break older gateways.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum CommandKind {
    DeleteMessage,
    Unknown(u32),
}

impl From<u32> for CommandKind {
    fn from(value: u32) -> Self {
        match value {
            0 => CommandKind::DeleteMessage,
            other => CommandKind::Unknown(other),
        }
    }
}

impl From<CommandKind> for u32 {
    fn from(kind: CommandKind) -> Self {
        match kind {
            CommandKind::DeleteMessage => 0,
            CommandKind::Unknown(other) => other,
        }
    }
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::DeleteMessage => "delete_message",
            CommandKind::Unknown(_) => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandEnvelope {
    #[serde(rename = "type")]
    pub kind: CommandKind,
    pub channel_id: String,
    pub message_id: String,
    #[serde(default)]
    pub reason: String,
}

impl CommandEnvelope {
    pub fn delete_message(
        channel_id: impl Into<String>,
        message_id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            kind: CommandKind::DeleteMessage,
            channel_id: channel_id.into(),
            message_id: message_id.into(),
            reason: reason.into(),
        }
    }
}

/// Anything that can appear on the command topic: gateway directives and
/// `!`-prefixed chat messages share it. Directives carry a `type` field, chat
/// messages never do.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum CommandTopicPayload {
    Directive(CommandEnvelope),
    Chat(InboundEnvelope),
}

pub fn encode<T: Serialize + ?Sized>(envelope: &T) -> Result<Bytes, EnvelopeError> {
    Ok(Bytes::from(serde_json::to_vec(envelope)?))
}

pub fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<T, EnvelopeError> {
    Ok(serde_json::from_slice(payload)?)
}
