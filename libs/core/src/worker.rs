//! The subscribe / act / publish loop every feature worker runs.

use std::future::Future;

use futures::StreamExt;
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, warn};
use vpb_bus::{
    BrokerTransport, BusError, COMMAND_TOPIC, MessageStream, OUTBOUND_TOPIC, RedisBroker,
    RedisOptions,
};
use vpb_telemetry::metrics::WORKER_DECODE_FAILED;

use crate::envelope::{CommandEnvelope, OutboundEnvelope, decode};

/// Something a worker asks the gateway to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Send(OutboundEnvelope),
    Command(CommandEnvelope),
}

impl Directive {
    pub fn topic(&self) -> &'static str {
        match self {
            Directive::Send(_) => OUTBOUND_TOPIC,
            Directive::Command(_) => COMMAND_TOPIC,
        }
    }
}

impl From<OutboundEnvelope> for Directive {
    fn from(env: OutboundEnvelope) -> Self {
        Directive::Send(env)
    }
}

impl From<CommandEnvelope> for Directive {
    fn from(env: CommandEnvelope) -> Self {
        Directive::Command(env)
    }
}

/// Feature logic: turns one decoded input into zero or more directives.
pub trait FeatureHandler: Send + Sync {
    type Input: DeserializeOwned + Send;

    fn name(&self) -> &'static str;

    fn handle(&self, input: Self::Input) -> Vec<Directive>;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStats {
    pub received: u64,
    pub decode_failed: u64,
    pub published: u64,
    pub publish_failed: u64,
    /// The subscription ended before shutdown was requested.
    pub stream_closed: bool,
}

/// Drives `handler` over `messages` until the stream ends or `shutdown`
/// resolves. A message already pulled off the stream is fully handled before
/// shutdown is observed.
pub async fn run_worker<H, B, S>(
    handler: &H,
    mut messages: MessageStream,
    publisher: &B,
    shutdown: S,
) -> WorkerStats
where
    H: FeatureHandler,
    B: BrokerTransport + ?Sized,
    S: Future<Output = ()>,
{
    let mut stats = WorkerStats::default();
    tokio::pin!(shutdown);

    loop {
        let msg = tokio::select! {
            biased;
            _ = &mut shutdown => {
                debug!(worker = handler.name(), "shutdown requested");
                break;
            }
            next = messages.next() => match next {
                Some(msg) => msg,
                None => {
                    stats.stream_closed = true;
                    break;
                }
            },
        };
        stats.received += 1;

        let input = match decode::<H::Input>(&msg.payload) {
            Ok(input) => input,
            Err(err) => {
                stats.decode_failed += 1;
                vpb_telemetry::record_counter(WORKER_DECODE_FAILED, "worker", handler.name());
                warn!(
                    worker = handler.name(),
                    topic = %msg.topic,
                    error = %err,
                    "skipping undecodable message"
                );
                continue;
            }
        };

        for directive in handler.handle(input) {
            let topic = directive.topic();
            let result = match &directive {
                Directive::Send(env) => vpb_bus::publish(publisher, topic, env).await,
                Directive::Command(env) => vpb_bus::publish(publisher, topic, env).await,
            };
            match result {
                Ok(()) => stats.published += 1,
                Err(err) => {
                    stats.publish_failed += 1;
                    error!(
                        worker = handler.name(),
                        topic,
                        error = %err,
                        "publish failed; dropping directive"
                    );
                }
            }
        }
    }

    debug!(worker = handler.name(), ?stats, "worker loop finished");
    stats
}

/// Process entry point for a single-topic worker: one broker client to
/// subscribe on `topic`, one to publish directives, both closed on exit.
pub async fn serve<H: FeatureHandler>(
    handler: &H,
    options: &RedisOptions,
    topic: &str,
) -> Result<WorkerStats, BusError> {
    let mut incoming = RedisBroker::connect(options).await?;
    let mut outgoing = RedisBroker::connect(options).await?;
    let messages = incoming.subscribe(topic).await?;
    info!(worker = handler.name(), topic, "worker is now running; press ctrl-c to exit");

    let stats = run_worker(handler, messages, &outgoing, crate::shutdown_signal()).await;

    incoming.close().await?;
    outgoing.close().await?;
    info!(worker = handler.name(), ?stats, "worker stopped");
    if stats.stream_closed {
        return Err(BusError::SubscriptionLost(topic.to_string()));
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::InboundEnvelope;
    use vpb_bus::{InMemoryHub, message_topic};

    struct Echo;

    impl FeatureHandler for Echo {
        type Input = InboundEnvelope;

        fn name(&self) -> &'static str {
            "echo"
        }

        fn handle(&self, input: InboundEnvelope) -> Vec<Directive> {
            vec![OutboundEnvelope::message(input.channel_id, input.content).into()]
        }
    }

    fn inbound(content: &str) -> InboundEnvelope {
        InboundEnvelope {
            message_id: "M1".into(),
            channel_id: "C1".into(),
            user_id: "U1".into(),
            content: content.into(),
            has_attachments_or_embeds: false,
            is_thread: false,
        }
    }

    #[tokio::test]
    async fn skips_undecodable_messages_and_keeps_going() {
        let hub = InMemoryHub::new();
        let mut incoming = hub.client();
        let outgoing = hub.client();
        let stream = incoming.subscribe(&message_topic("C1")).await.unwrap();

        let feeder = hub.client();
        feeder
            .publish_bytes(&message_topic("C1"), "{oops".into())
            .await
            .unwrap();
        vpb_bus::publish(&feeder, &message_topic("C1"), &inbound("hi"))
            .await
            .unwrap();
        hub.take_published().await;

        let worker = run_worker(&Echo, stream, &outgoing, async {
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        });
        let stats = worker.await;
        incoming.close().await.unwrap();

        assert_eq!(stats.received, 2);
        assert_eq!(stats.decode_failed, 1);
        assert_eq!(stats.published, 1);
        assert!(!stats.stream_closed);

        let published = hub.take_published().await;
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].topic, OUTBOUND_TOPIC);
        let env: OutboundEnvelope = decode(&published[0].payload).unwrap();
        assert_eq!(env.content, "hi");
    }

    #[tokio::test]
    async fn a_lost_subscription_is_reported() {
        let hub = InMemoryHub::new();
        let mut incoming = hub.client();
        let outgoing = hub.client();
        let stream = incoming.subscribe(&message_topic("C1")).await.unwrap();
        incoming.close().await.unwrap();

        let stats = run_worker(&Echo, stream, &outgoing, std::future::pending()).await;
        assert!(stats.stream_closed);
        assert_eq!(stats.received, 0);
    }

    #[test]
    fn directives_pick_their_topic() {
        let send: Directive = OutboundEnvelope::message("C1", "x").into();
        let cmd: Directive = CommandEnvelope::delete_message("C1", "M1", "r").into();
        assert_eq!(send.topic(), OUTBOUND_TOPIC);
        assert_eq!(cmd.topic(), COMMAND_TOPIC);
    }
}
