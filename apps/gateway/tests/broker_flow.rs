use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use vpb_bus::{BrokerTransport, COMMAND_TOPIC, InMemoryHub, OUTBOUND_TOPIC, publish};
use vpb_core::{CommandEnvelope, CommandKind, InboundEnvelope, OutboundEnvelope, decode};
use vpb_correlation::InMemoryCorrelationStore;
use vpb_gateway::{
    ChatMessageEvent, CommandExecutor, DispatchAction, DrainStats, InboundRelay,
    OutboundDispatcher, run_command_drain, run_outbound_drain,
};
use vpb_testutil::{PlatformCall, RecordingChatPlatform};

const WAIT: Duration = Duration::from_secs(2);

struct Harness {
    hub: InMemoryHub,
    platform: RecordingChatPlatform,
    stop: Vec<oneshot::Sender<()>>,
    drains: Vec<JoinHandle<DrainStats>>,
}

impl Harness {
    async fn start() -> Self {
        let hub = InMemoryHub::new();
        let platform = RecordingChatPlatform::new();
        let shared: Arc<dyn vpb_core::ChatPlatform> = Arc::new(platform.clone());

        let mut outbound_bus = hub.client();
        let mut command_bus = hub.client();
        let outbound_stream = outbound_bus.subscribe(OUTBOUND_TOPIC).await.unwrap();
        let command_stream = command_bus.subscribe(COMMAND_TOPIC).await.unwrap();

        let dispatcher = OutboundDispatcher::new(
            shared.clone(),
            Arc::new(InMemoryCorrelationStore::new()),
            Duration::from_secs(24 * 3600),
        );
        let (stop_out, out_rx) = oneshot::channel::<()>();
        let (stop_cmd, cmd_rx) = oneshot::channel::<()>();
        let drains = vec![
            tokio::spawn(run_outbound_drain(dispatcher, outbound_stream, async move {
                let _ = out_rx.await;
            })),
            tokio::spawn(run_command_drain(
                CommandExecutor::new(shared),
                command_stream,
                async move {
                    let _ = cmd_rx.await;
                },
            )),
        ];

        Self {
            hub,
            platform,
            stop: vec![stop_out, stop_cmd],
            drains,
        }
    }

    async fn publish<T: serde::Serialize>(&self, topic: &str, envelope: &T) {
        publish(&self.hub.client(), topic, envelope).await.unwrap();
    }

    async fn stop(self) -> Vec<DrainStats> {
        for tx in self.stop {
            let _ = tx.send(());
        }
        let mut stats = Vec::new();
        for drain in self.drains {
            stats.push(drain.await.unwrap());
        }
        stats
    }
}

#[tokio::test]
async fn scenario_a_bang_command_lands_on_command_topic() {
    let hub = InMemoryHub::new();
    let mut observer = hub.client();
    let mut stream = observer.subscribe("discord.*").await.unwrap();

    let relay = InboundRelay::new(hub.client());
    relay.set_bot_user_id("BOT");
    relay
        .relay(ChatMessageEvent {
            message_id: "M1".into(),
            channel_id: "C1".into(),
            author_id: "U1".into(),
            content: "!ack".into(),
            has_attachments_or_embeds: false,
            is_thread: false,
        })
        .await;

    let msg = tokio::time::timeout(WAIT, futures::StreamExt::next(&mut stream))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(msg.topic, "discord.cmd");
    let env: InboundEnvelope = decode(&msg.payload).unwrap();
    assert_eq!(env.channel_id, "C1");
    assert_eq!(env.content, "!ack");

    let published = hub.take_published().await;
    assert_eq!(published.len(), 1);
    observer.close().await.unwrap();
}

#[tokio::test]
async fn scenario_b_internal_id_upserts_one_message() {
    let harness = Harness::start().await;
    let first =
        OutboundEnvelope::message("C2", "job A failed").with_internal_id("github:suite:42:msg");
    let second = OutboundEnvelope::message("C2", "job A failed\njob B failed")
        .with_internal_id("github:suite:42:msg");

    harness.publish(OUTBOUND_TOPIC, &first).await;
    harness.platform.wait_for_calls(1, WAIT).await;
    harness.publish(OUTBOUND_TOPIC, &second).await;
    let calls = harness.platform.wait_for_calls(2, WAIT).await;

    assert_eq!(
        calls,
        vec![
            PlatformCall::Send {
                channel_id: "C2".into(),
                content: "job A failed".into()
            },
            PlatformCall::Edit {
                channel_id: "C2".into(),
                message_id: "M1".into(),
                content: "job A failed\njob B failed".into()
            },
        ]
    );
    harness.stop().await;
}

#[tokio::test]
async fn scenario_c_delete_command_deletes_once() {
    let harness = Harness::start().await;
    harness
        .publish(
            COMMAND_TOPIC,
            &CommandEnvelope::delete_message("C3", "M9", "failed showcase checks"),
        )
        .await;

    let calls = harness.platform.wait_for_calls(1, WAIT).await;
    assert_eq!(
        calls,
        vec![PlatformCall::Delete {
            channel_id: "C3".into(),
            message_id: "M9".into(),
            reason: "failed showcase checks".into()
        }]
    );
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(harness.platform.calls().len(), 1);
    harness.stop().await;
}

#[tokio::test]
async fn unknown_commands_and_chat_traffic_do_not_stop_the_command_drain() {
    let harness = Harness::start().await;
    let unknown = CommandEnvelope {
        kind: CommandKind::Unknown(99),
        ..CommandEnvelope::delete_message("C3", "M1", "")
    };
    let chat = InboundEnvelope {
        message_id: "M2".into(),
        channel_id: "C3".into(),
        user_id: "U1".into(),
        content: "!help".into(),
        has_attachments_or_embeds: false,
        is_thread: false,
    };

    harness.publish(COMMAND_TOPIC, &unknown).await;
    harness.publish(COMMAND_TOPIC, &chat).await;
    harness
        .hub
        .client()
        .publish_bytes(COMMAND_TOPIC, "not json".into())
        .await
        .unwrap();
    harness
        .publish(COMMAND_TOPIC, &CommandEnvelope::delete_message("C3", "M3", ""))
        .await;

    let calls = harness.platform.wait_for_calls(1, WAIT).await;
    assert_eq!(
        calls,
        vec![PlatformCall::Delete {
            channel_id: "C3".into(),
            message_id: "M3".into(),
            reason: String::new()
        }]
    );

    let stats = harness.stop().await;
    let command = stats[1];
    assert_eq!(command.handled, 1);
    assert_eq!(command.failed, 1);
    assert_eq!(command.malformed, 1);
}

#[tokio::test]
async fn platform_failures_drop_the_envelope_and_keep_draining() {
    let harness = Harness::start().await;
    harness.platform.fail_on(vpb_testutil::Operation::CreateDm);

    harness
        .publish(OUTBOUND_TOPIC, &OutboundEnvelope::direct("U1", "hello"))
        .await;
    harness
        .publish(OUTBOUND_TOPIC, &OutboundEnvelope::message("C1", "still here"))
        .await;

    let calls = harness.platform.wait_for_calls(2, WAIT).await;
    assert_eq!(
        calls.last(),
        Some(&PlatformCall::Send {
            channel_id: "C1".into(),
            content: "still here".into()
        })
    );
    let stats = harness.stop().await;
    assert_eq!(stats[0].failed, 1);
    assert_eq!(stats[0].handled, 1);
}

#[tokio::test(start_paused = true)]
async fn expired_correlation_behaves_like_a_miss() {
    let platform = RecordingChatPlatform::new();
    let dispatcher = OutboundDispatcher::new(
        Arc::new(platform.clone()),
        Arc::new(InMemoryCorrelationStore::new()),
        Duration::from_secs(3600),
    );
    let env = OutboundEnvelope::message("C2", "status").with_internal_id("github:suite:7:msg");

    assert!(matches!(
        dispatcher.dispatch(&env).await.unwrap(),
        DispatchAction::Created { .. }
    ));
    tokio::time::advance(Duration::from_secs(3599)).await;
    assert_eq!(
        dispatcher.dispatch(&env).await.unwrap(),
        DispatchAction::Edited {
            message_id: "M1".into()
        }
    );
    tokio::time::advance(Duration::from_secs(2)).await;
    assert_eq!(
        dispatcher.dispatch(&env).await.unwrap(),
        DispatchAction::Created {
            message_id: "M2".into()
        }
    );
}
