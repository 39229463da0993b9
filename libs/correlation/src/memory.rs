use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;

use crate::{CorrelationError, CorrelationStore};

/// In-process store used by tests and single-process setups. Expiry follows
/// the tokio clock so paused-time tests can step over a TTL.
#[derive(Default)]
pub struct InMemoryCorrelationStore {
    entries: DashMap<String, (String, Instant)>,
}

impl InMemoryCorrelationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, (_, expires)| *expires > now);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CorrelationStore for InMemoryCorrelationStore {
    async fn put(
        &self,
        internal_id: &str,
        message_id: &str,
        ttl: Duration,
    ) -> Result<(), CorrelationError> {
        self.entries.insert(
            internal_id.to_string(),
            (message_id.to_string(), Instant::now() + ttl),
        );
        Ok(())
    }

    async fn get(&self, internal_id: &str) -> Result<Option<String>, CorrelationError> {
        let now = Instant::now();
        Ok(self
            .entries
            .get(internal_id)
            .filter(|entry| entry.value().1 > now)
            .map(|entry| entry.value().0.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_overwrites_previous_value() {
        let store = InMemoryCorrelationStore::new();
        store.put("k", "m1", Duration::from_secs(10)).await.unwrap();
        store.put("k", "m2", Duration::from_secs(10)).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("m2"));
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entries_read_as_misses() {
        let store = InMemoryCorrelationStore::new();
        store
            .put("github:suite:1:msg", "m1", Duration::from_secs(60))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(
            store.get("github:suite:1:msg").await.unwrap().as_deref(),
            Some("m1")
        );

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(store.get("github:suite:1:msg").await.unwrap(), None);

        store.purge_expired();
        assert!(store.is_empty());
    }
}
