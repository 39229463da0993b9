use std::fmt;

use thiserror::Error;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayPhase {
    Disconnected,
    Connecting,
    Connected,
    ShuttingDown,
    Closed,
}

impl GatewayPhase {
    pub fn is_stopping(self) -> bool {
        matches!(self, GatewayPhase::ShuttingDown | GatewayPhase::Closed)
    }

    fn can_advance_to(self, next: GatewayPhase) -> bool {
        use GatewayPhase::*;
        matches!(
            (self, next),
            (Disconnected, Connecting)
                | (Connecting, Connected)
                | (Connecting, ShuttingDown)
                | (Connected, ShuttingDown)
                | (ShuttingDown, Closed)
        )
    }
}

impl fmt::Display for GatewayPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GatewayPhase::Disconnected => "disconnected",
            GatewayPhase::Connecting => "connecting",
            GatewayPhase::Connected => "connected",
            GatewayPhase::ShuttingDown => "shutting_down",
            GatewayPhase::Closed => "closed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("gateway cannot go from {from} to {to}")]
pub struct LifecycleError {
    pub from: GatewayPhase,
    pub to: GatewayPhase,
}

/// Shared view of where the gateway process is. Cloning shares the phase.
#[derive(Clone)]
pub struct Lifecycle {
    tx: watch::Sender<GatewayPhase>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(GatewayPhase::Disconnected);
        Self { tx }
    }

    pub fn phase(&self) -> GatewayPhase {
        *self.tx.borrow()
    }

    /// Moves to `next`. Re-entering the current phase is a no-op so a
    /// repeated ready event after a resume does not fail.
    pub fn advance(&self, next: GatewayPhase) -> Result<(), LifecycleError> {
        let mut result = Ok(());
        self.tx.send_if_modified(|phase| {
            if *phase == next {
                false
            } else if phase.can_advance_to(next) {
                tracing::info!(from = %phase, to = %next, "gateway phase change");
                *phase = next;
                true
            } else {
                result = Err(LifecycleError {
                    from: *phase,
                    to: next,
                });
                false
            }
        });
        result
    }

    /// Resolves once shutdown has begun.
    pub fn until_shutdown(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.tx.subscribe();
        async move {
            // A dropped sender means the process is going away.
            let _ = rx.wait_for(|phase| phase.is_stopping()).await;
        }
    }
}
