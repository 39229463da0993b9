//! Counter names emitted across the gateway and workers. Without an installed
//! recorder these are no-ops.

pub const RELAY_PUBLISHED: &str = "vpbot_relay_published_total";
pub const RELAY_SKIPPED: &str = "vpbot_relay_skipped_total";
pub const OUTBOUND_TOTAL: &str = "vpbot_outbound_total";
pub const OUTBOUND_FAILED: &str = "vpbot_outbound_failed_total";
pub const COMMAND_TOTAL: &str = "vpbot_command_total";
pub const WORKER_DECODE_FAILED: &str = "vpbot_worker_decode_failed_total";
pub const WEBHOOK_TOTAL: &str = "vpbot_github_webhook_total";

/// Increments `name` by one with a single label.
pub fn record_counter(name: &'static str, label: &'static str, value: &str) {
    metrics::counter!(name, label => value.to_string()).increment(1);
}
