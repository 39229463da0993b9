//! Logging and counter helpers shared by every vpbot process.

mod config;
pub mod metrics;
mod tracing_init;

use anyhow::Result;

pub use config::TelemetryConfig;
pub use metrics::record_counter;
pub use tracing_init::init_telemetry;

/// Installs the subscriber for `service_name`, honouring `--dev-logging`.
pub fn install(service_name: &str, service_version: &str, dev_logging: bool) -> Result<()> {
    init_telemetry(
        TelemetryConfig::from_env(service_name, service_version).with_dev_logging(dev_logging),
    )
}
