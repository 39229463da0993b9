use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use futures::stream::abortable;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::{debug, trace};

use crate::{
    ActiveSubscription, BrokerTransport, BusError, MessageStream, RawMessage, is_pattern,
};

/// Address and credentials of the Redis broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisOptions {
    pub addr: String,
    pub password: String,
}

impl RedisOptions {
    pub fn new(addr: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            password: password.into(),
        }
    }

    /// Connection URL for database 0.
    pub fn url(&self) -> String {
        if self.password.is_empty() {
            format!("redis://{}/0", self.addr)
        } else {
            format!(
                "redis://:{}@{}/0",
                urlencoding::encode(&self.password),
                self.addr
            )
        }
    }
}

/// Redis pub/sub transport. Publishing goes through a managed connection; a
/// subscription opens its own dedicated pub/sub connection.
pub struct RedisBroker {
    client: redis::Client,
    connection: Option<ConnectionManager>,
    active: Option<ActiveSubscription>,
}

impl RedisBroker {
    /// Connects eagerly so an unreachable broker fails at construction.
    pub async fn connect(options: &RedisOptions) -> Result<Self, BusError> {
        let client = redis::Client::open(options.url())?;
        let connection = ConnectionManager::new(client.clone()).await?;
        debug!(addr = %options.addr, "connected to redis broker");
        Ok(Self {
            client,
            connection: Some(connection),
            active: None,
        })
    }
}

#[async_trait]
impl BrokerTransport for RedisBroker {
    async fn publish_bytes(&self, topic: &str, payload: Bytes) -> Result<(), BusError> {
        let mut conn = self.connection.clone().ok_or(BusError::Closed)?;
        trace!(%topic, bytes = payload.len(), "publishing");
        conn.publish::<_, _, ()>(topic, payload.as_ref()).await?;
        Ok(())
    }

    async fn subscribe(&mut self, topic: &str) -> Result<MessageStream, BusError> {
        if self.connection.is_none() {
            return Err(BusError::Closed);
        }
        if let Some(active) = &self.active {
            return Err(BusError::AlreadySubscribed(active.topic.clone()));
        }

        let mut pubsub = self.client.get_async_pubsub().await?;
        if is_pattern(topic) {
            pubsub.psubscribe(topic).await?;
        } else {
            pubsub.subscribe(topic).await?;
        }
        trace!(%topic, pattern = is_pattern(topic), "subscribed");

        let messages = pubsub.into_on_message().map(|msg| RawMessage {
            topic: msg.get_channel_name().to_string(),
            payload: Bytes::copy_from_slice(msg.get_payload_bytes()),
        });
        let (messages, handle) = abortable(messages);
        self.active = Some(ActiveSubscription {
            topic: topic.to_string(),
            handle,
        });
        Ok(messages.boxed())
    }

    async fn close(&mut self) -> Result<(), BusError> {
        if let Some(active) = self.active.take() {
            active.cancel();
        }
        if self.connection.take().is_some() {
            debug!("redis broker connection released");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_without_password() {
        let opts = RedisOptions::new("localhost:6379", "");
        assert_eq!(opts.url(), "redis://localhost:6379/0");
    }

    #[test]
    fn url_encodes_password() {
        let opts = RedisOptions::new("redis.internal:6380", "p@ss/word");
        assert_eq!(opts.url(), "redis://:p%40ss%2Fword@redis.internal:6380/0");
    }
}
