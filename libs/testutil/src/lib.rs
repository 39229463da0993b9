//! A [`ChatPlatform`] that records every call instead of talking to Discord.

use std::collections::HashSet;
use std::pin::pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use vpb_core::{ChatPlatform, PlatformError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    Send {
        channel_id: String,
        content: String,
    },
    Reply {
        channel_id: String,
        message_id: String,
        content: String,
    },
    Edit {
        channel_id: String,
        message_id: String,
        content: String,
    },
    Delete {
        channel_id: String,
        message_id: String,
        reason: String,
    },
    CreateDm {
        user_id: String,
    },
}

impl PlatformCall {
    fn operation(&self) -> Operation {
        match self {
            PlatformCall::Send { .. } => Operation::Send,
            PlatformCall::Reply { .. } => Operation::Reply,
            PlatformCall::Edit { .. } => Operation::Edit,
            PlatformCall::Delete { .. } => Operation::Delete,
            PlatformCall::CreateDm { .. } => Operation::CreateDm,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Send,
    Reply,
    Edit,
    Delete,
    CreateDm,
}

#[derive(Default)]
struct State {
    calls: Vec<PlatformCall>,
    next_message: u64,
    failing: HashSet<Operation>,
}

/// Records calls in order. Sent messages get ids `M1`, `M2`, ...; DM channels
/// are `DM-<user>`. Operations can be made to fail with [`fail_on`].
///
/// [`fail_on`]: RecordingChatPlatform::fail_on
#[derive(Clone, Default)]
pub struct RecordingChatPlatform {
    state: Arc<Mutex<State>>,
    changed: Arc<Notify>,
}

impl RecordingChatPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<PlatformCall> {
        self.lock().calls.clone()
    }

    pub fn fail_on(&self, op: Operation) {
        self.lock().failing.insert(op);
    }

    pub fn recover(&self, op: Operation) {
        self.lock().failing.remove(&op);
    }

    /// Waits until at least `count` calls were recorded, or `timeout` passes.
    /// Returns the calls seen either way.
    pub async fn wait_for_calls(&self, count: usize, timeout: Duration) -> Vec<PlatformCall> {
        let wait = async {
            loop {
                let mut notified = pin!(self.changed.notified());
                notified.as_mut().enable();
                if self.lock().calls.len() >= count {
                    return;
                }
                notified.await;
            }
        };
        let _ = tokio::time::timeout(timeout, wait).await;
        self.calls()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, call: PlatformCall) -> Result<(), PlatformError> {
        let op = call.operation();
        let failed = {
            let mut state = self.lock();
            state.calls.push(call);
            state.failing.contains(&op)
        };
        self.changed.notify_waiters();
        if failed {
            Err(PlatformError::request(format!("{op:?} rejected by test")))
        } else {
            Ok(())
        }
    }

    fn next_message_id(&self) -> String {
        let mut state = self.lock();
        state.next_message += 1;
        format!("M{}", state.next_message)
    }
}

#[async_trait]
impl ChatPlatform for RecordingChatPlatform {
    async fn send_message(
        &self,
        channel_id: &str,
        content: &str,
    ) -> Result<String, PlatformError> {
        self.record(PlatformCall::Send {
            channel_id: channel_id.into(),
            content: content.into(),
        })?;
        Ok(self.next_message_id())
    }

    async fn send_reply(
        &self,
        channel_id: &str,
        message_id: &str,
        content: &str,
    ) -> Result<String, PlatformError> {
        self.record(PlatformCall::Reply {
            channel_id: channel_id.into(),
            message_id: message_id.into(),
            content: content.into(),
        })?;
        Ok(self.next_message_id())
    }

    async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        content: &str,
    ) -> Result<(), PlatformError> {
        self.record(PlatformCall::Edit {
            channel_id: channel_id.into(),
            message_id: message_id.into(),
            content: content.into(),
        })
    }

    async fn delete_message(
        &self,
        channel_id: &str,
        message_id: &str,
        reason: &str,
    ) -> Result<(), PlatformError> {
        self.record(PlatformCall::Delete {
            channel_id: channel_id.into(),
            message_id: message_id.into(),
            reason: reason.into(),
        })
    }

    async fn create_dm_channel(&self, user_id: &str) -> Result<String, PlatformError> {
        self.record(PlatformCall::CreateDm {
            user_id: user_id.into(),
        })?;
        Ok(format!("DM-{user_id}"))
    }
}
