use async_trait::async_trait;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("invalid {kind} id `{value}`")]
    InvalidId { kind: &'static str, value: String },
    #[error("chat platform request failed: {0}")]
    Request(#[source] BoxError),
}

impl PlatformError {
    pub fn request(err: impl Into<BoxError>) -> Self {
        PlatformError::Request(err.into())
    }
}

/// The mutating chat-platform operations the gateway performs on behalf of
/// workers. Ids are the platform's opaque strings.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Sends `content` to `channel_id` and returns the new message id.
    async fn send_message(&self, channel_id: &str, content: &str)
    -> Result<String, PlatformError>;

    /// Sends `content` as a reply to `message_id` and returns the new message id.
    async fn send_reply(
        &self,
        channel_id: &str,
        message_id: &str,
        content: &str,
    ) -> Result<String, PlatformError>;

    async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        content: &str,
    ) -> Result<(), PlatformError>;

    async fn delete_message(
        &self,
        channel_id: &str,
        message_id: &str,
        reason: &str,
    ) -> Result<(), PlatformError>;

    /// Opens (or reuses) the DM channel with `user_id` and returns its id.
    async fn create_dm_channel(&self, user_id: &str) -> Result<String, PlatformError>;
}
