//! Correlation between application-chosen internal ids and the platform ids of
//! messages already sent under them.
//!
//! The gateway consults this store to turn repeated publishes carrying the same
//! internal id into edits of one message. Entries are never deleted; they expire.

mod memory;
mod redis_store;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

pub use memory::InMemoryCorrelationStore;
pub use redis_store::RedisCorrelationStore;

/// Lifetime of a correlation written by the outbound drain.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(thiserror::Error, Debug)]
pub enum CorrelationError {
    #[error("correlation backend unavailable: {0}")]
    Backend(#[from] redis::RedisError),
}

#[async_trait]
pub trait CorrelationStore: Send + Sync {
    /// Unconditionally maps `internal_id` to `message_id` for `ttl`.
    async fn put(
        &self,
        internal_id: &str,
        message_id: &str,
        ttl: Duration,
    ) -> Result<(), CorrelationError>;

    /// Returns the stored message id. A missing or expired entry is `Ok(None)`.
    async fn get(&self, internal_id: &str) -> Result<Option<String>, CorrelationError>;
}

pub type SharedCorrelationStore = Arc<dyn CorrelationStore>;

/// TTL settings handed to the gateway at startup.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationConfig {
    pub ttl: Duration,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self { ttl: DEFAULT_TTL }
    }
}

impl CorrelationConfig {
    pub fn from_hours(hours: u64) -> Self {
        Self {
            ttl: Duration::from_secs(hours.max(1).saturating_mul(3600)),
        }
    }
}
