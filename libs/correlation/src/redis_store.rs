use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::trace;

use crate::{CorrelationError, CorrelationStore};

/// Correlations kept as plain string keys with `SETEX`, on the same Redis the
/// broker runs on.
#[derive(Clone)]
pub struct RedisCorrelationStore {
    connection: ConnectionManager,
}

impl RedisCorrelationStore {
    pub async fn connect(url: &str) -> Result<Self, CorrelationError> {
        let client = redis::Client::open(url)?;
        let connection = ConnectionManager::new(client).await?;
        Ok(Self { connection })
    }

    pub fn from_connection(connection: ConnectionManager) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl CorrelationStore for RedisCorrelationStore {
    async fn put(
        &self,
        internal_id: &str,
        message_id: &str,
        ttl: Duration,
    ) -> Result<(), CorrelationError> {
        let mut conn = self.connection.clone();
        let seconds = ttl.as_secs().max(1);
        trace!(%internal_id, %message_id, ttl_secs = seconds, "storing correlation");
        conn.set_ex::<_, _, ()>(internal_id, message_id, seconds).await?;
        Ok(())
    }

    async fn get(&self, internal_id: &str) -> Result<Option<String>, CorrelationError> {
        let mut conn = self.connection.clone();
        let stored: Option<String> = conn.get(internal_id).await?;
        Ok(stored)
    }
}
