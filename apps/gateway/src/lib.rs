//! The vpbot gateway: the one process holding the Discord connection.
//!
//! Inbound chat events are republished by [`relay::InboundRelay`]; envelopes
//! arriving on `discord.out` and `discord.cmd` are executed by the outbound and
//! command drains.

pub mod commands;
pub mod config;
pub mod discord;
pub mod lifecycle;
mod main_logic;
pub mod outbound;
pub mod relay;

pub use commands::{CommandExecutor, CommandOutcome, run_command_drain};
pub use config::GatewayConfig;
pub use lifecycle::{GatewayPhase, Lifecycle, LifecycleError};
pub use main_logic::run;
pub use outbound::{DispatchAction, DrainStats, OutboundDispatcher, run_outbound_drain};
pub use relay::{ChatMessageEvent, InboundRelay, RelayOutcome};
