//! Contracts shared by the vpbot gateway and its feature workers.
//!
//! The gateway republishes chat events as [`InboundEnvelope`]s and executes the
//! [`OutboundEnvelope`]s and [`CommandEnvelope`]s workers publish back. Workers
//! implement [`FeatureHandler`] and run inside [`run_worker`].

pub mod config;
pub mod envelope;
pub mod platform;
pub mod signal;
pub mod worker;

pub use config::BrokerArgs;
pub use envelope::*;
pub use platform::{BoxError, ChatPlatform, PlatformError};
pub use signal::shutdown_signal;
pub use worker::{Directive, FeatureHandler, WorkerStats, run_worker, serve};
