use std::sync::Arc;

use async_trait::async_trait;
use serenity::http::Http;
use serenity::model::channel::Channel;
use serenity::model::id::ChannelId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MemberCountError {
    #[error("invalid channel id {0:?}")]
    InvalidChannel(String),
    #[error("channel {0} does not belong to a guild")]
    NotInGuild(String),
    #[error("discord did not report a member count for guild {0}")]
    Unreported(String),
    #[error("discord request failed: {0}")]
    Request(#[from] serenity::Error),
}

/// A guild and its approximate member count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildMembers {
    pub guild_id: String,
    pub count: i64,
}

#[async_trait]
pub trait MemberCountSource: Send + Sync {
    /// Member count of the guild that owns `channel_id`.
    async fn members_of(&self, channel_id: &str) -> Result<GuildMembers, MemberCountError>;
}

/// Reads counts over Discord's REST API; no gateway session is opened.
pub struct DiscordMemberCounts {
    http: Arc<Http>,
}

impl DiscordMemberCounts {
    pub fn new(token: &str) -> Self {
        Self {
            http: Arc::new(Http::new(token)),
        }
    }
}

#[async_trait]
impl MemberCountSource for DiscordMemberCounts {
    async fn members_of(&self, channel_id: &str) -> Result<GuildMembers, MemberCountError> {
        let id = channel_id
            .parse::<u64>()
            .ok()
            .filter(|id| *id != 0)
            .ok_or_else(|| MemberCountError::InvalidChannel(channel_id.to_string()))?;

        let Channel::Guild(channel) = ChannelId::new(id).to_channel(&*self.http).await? else {
            return Err(MemberCountError::NotInGuild(channel_id.to_string()));
        };
        let guild = channel
            .guild_id
            .to_partial_guild_with_counts(&*self.http)
            .await?;
        let count = guild
            .approximate_member_count
            .ok_or_else(|| MemberCountError::Unreported(guild.id.to_string()))?;

        Ok(GuildMembers {
            guild_id: guild.id.to_string(),
            count: i64::try_from(count).unwrap_or(i64::MAX),
        })
    }
}
