use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use futures::stream::{abortable, unfold};
use tokio::sync::{Mutex, mpsc};

use crate::{
    ActiveSubscription, BrokerTransport, BusError, MessageStream, RawMessage, topic_matches,
};

struct HubSubscriber {
    id: u64,
    pattern: String,
    tx: mpsc::UnboundedSender<RawMessage>,
}

#[derive(Default)]
struct HubState {
    subscribers: Vec<HubSubscriber>,
    published: Vec<RawMessage>,
}

/// Process-local stand-in for the broker. Every client created from the same
/// hub sees the same topics; delivery is live-only like Redis pub/sub.
///
/// Meant for tests and local runs: every delivered message is also appended to
/// an unbounded log that only [`InMemoryHub::take_published`] empties.
#[derive(Clone, Default)]
pub struct InMemoryHub {
    state: Arc<Mutex<HubState>>,
    next_id: Arc<AtomicU64>,
}

impl InMemoryHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh client bound to this hub.
    pub fn client(&self) -> InMemoryBroker {
        InMemoryBroker {
            hub: self.clone(),
            active: None,
            subscriber_id: None,
            closed: false,
        }
    }

    /// Drains the log of everything published so far.
    pub async fn take_published(&self) -> Vec<RawMessage> {
        let mut guard = self.state.lock().await;
        std::mem::take(&mut guard.published)
    }

    pub async fn subscriber_count(&self) -> usize {
        self.state.lock().await.subscribers.len()
    }

    async fn deliver(&self, message: RawMessage) {
        let mut guard = self.state.lock().await;
        guard.subscribers.retain(|sub| {
            !topic_matches(&sub.pattern, &message.topic) || sub.tx.send(message.clone()).is_ok()
        });
        guard.published.push(message);
    }

    async fn register(&self, pattern: &str) -> (u64, mpsc::UnboundedReceiver<RawMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.state.lock().await.subscribers.push(HubSubscriber {
            id,
            pattern: pattern.to_string(),
            tx,
        });
        (id, rx)
    }

    async fn unregister(&self, id: u64) {
        self.state.lock().await.subscribers.retain(|sub| sub.id != id);
    }
}

/// Client half of [`InMemoryHub`], obeying the same one-subscription rule as
/// the Redis transport.
pub struct InMemoryBroker {
    hub: InMemoryHub,
    active: Option<ActiveSubscription>,
    subscriber_id: Option<u64>,
    closed: bool,
}

#[async_trait]
impl BrokerTransport for InMemoryBroker {
    async fn publish_bytes(&self, topic: &str, payload: Bytes) -> Result<(), BusError> {
        if self.closed {
            return Err(BusError::Closed);
        }
        self.hub
            .deliver(RawMessage {
                topic: topic.to_string(),
                payload,
            })
            .await;
        Ok(())
    }

    async fn subscribe(&mut self, topic: &str) -> Result<MessageStream, BusError> {
        if self.closed {
            return Err(BusError::Closed);
        }
        if let Some(active) = &self.active {
            return Err(BusError::AlreadySubscribed(active.topic.clone()));
        }
        let (id, rx) = self.hub.register(topic).await;
        let messages = unfold(rx, |mut rx| async move { rx.recv().await.map(|msg| (msg, rx)) });
        let (messages, handle) = abortable(messages);
        self.subscriber_id = Some(id);
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
        if let Some(id) = self.subscriber_id.take() {
            self.hub.unregister(id).await;
        }
        self.closed = true;
        Ok(())
    }
}
