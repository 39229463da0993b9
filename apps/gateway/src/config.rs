use std::time::Duration;

use clap::Parser;
use vpb_core::BrokerArgs;
use vpb_correlation::CorrelationConfig;

#[derive(Debug, Clone, Parser)]
#[command(name = "vpb-gateway", about = "Bridges the Discord gateway to the vpbot broker")]
pub struct GatewayConfig {
    #[command(flatten)]
    pub broker: BrokerArgs,

    /// Bot token for connecting to the Discord gateway.
    #[arg(long, env = "DISCORD_TOKEN", hide_env_values = true)]
    pub token: String,

    /// How long an internal id keeps pointing at the message it created.
    #[arg(long, default_value_t = 24)]
    pub correlation_ttl_hours: u64,
}

impl GatewayConfig {
    pub fn correlation_ttl(&self) -> Duration {
        CorrelationConfig::from_hours(self.correlation_ttl_hours).ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_flag_and_ttl_default() {
        let cfg = GatewayConfig::try_parse_from(["vpb-gateway", "--token", "abc"]).unwrap();
        assert_eq!(cfg.token, "abc");
        assert_eq!(cfg.correlation_ttl(), Duration::from_secs(24 * 3600));
    }
}
