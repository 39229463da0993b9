//! Broker transport shared by the gateway and the feature workers.
//!
//! A transport instance owns one broker connection and at most one live
//! subscription. Processes that need several independent subscriptions create
//! several instances.

mod memory;
mod redis_broker;
pub mod topics;

pub use memory::{InMemoryBroker, InMemoryHub};
pub use redis_broker::{RedisBroker, RedisOptions};
pub use topics::*;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{AbortHandle, BoxStream};
use serde::Serialize;

#[derive(thiserror::Error, Debug)]
pub enum BusError {
    #[error("broker unavailable: {0}")]
    Unavailable(#[from] redis::RedisError),
    #[error("client already holds a subscription to {0}")]
    AlreadySubscribed(String),
    #[error("client is closed")]
    Closed,
    #[error("subscription to {0} ended unexpectedly")]
    SubscriptionLost(String),
    #[error("encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A message as delivered by the broker, before any envelope decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    /// Concrete topic the message was published on (never a pattern).
    pub topic: String,
    pub payload: Bytes,
}

/// Live-only stream of raw messages. Ends when the owning client closes its
/// subscription or the connection goes away.
pub type MessageStream = BoxStream<'static, RawMessage>;

#[async_trait]
pub trait BrokerTransport: Send + Sync {
    /// Publishes pre-encoded bytes. Not retried; the caller logs and drops on error.
    async fn publish_bytes(&self, topic: &str, payload: Bytes) -> Result<(), BusError>;

    /// Subscribes to an exact topic, or to a pattern when `topic` ends with `*`.
    async fn subscribe(&mut self, topic: &str) -> Result<MessageStream, BusError>;

    /// Ends the active subscription (if any) and releases the connection.
    async fn close(&mut self) -> Result<(), BusError>;
}

/// Serializes `envelope` as JSON and publishes it on `topic`.
pub async fn publish<B, T>(bus: &B, topic: &str, envelope: &T) -> Result<(), BusError>
where
    B: BrokerTransport + ?Sized,
    T: Serialize + ?Sized,
{
    let bytes = serde_json::to_vec(envelope)?;
    bus.publish_bytes(topic, Bytes::from(bytes)).await
}

/// Handle to the one subscription a client is allowed to hold.
#[derive(Debug)]
pub(crate) struct ActiveSubscription {
    pub(crate) topic: String,
    pub(crate) handle: AbortHandle,
}

impl ActiveSubscription {
    pub(crate) fn cancel(self) {
        tracing::debug!(topic = %self.topic, "closing subscription");
        self.handle.abort();
    }
}
