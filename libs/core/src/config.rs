use clap::Args;
use vpb_bus::RedisOptions;

/// Broker and logging flags shared by every vpbot binary.
#[derive(Debug, Clone, Args)]
pub struct BrokerArgs {
    /// Address of the Redis broker.
    #[arg(long, env = "REDIS_ADDR", default_value = "localhost:6379")]
    pub redis_addr: String,

    /// Password for the Redis broker.
    #[arg(long, env = "REDIS_PASSWORD", default_value = "", hide_env_values = true)]
    pub redis_pass: String,

    /// Human-readable logs at trace level.
    #[arg(long, env = "DEV_LOGGING")]
    pub dev_logging: bool,
}

impl BrokerArgs {
    pub fn redis_options(&self) -> RedisOptions {
        RedisOptions::new(&self.redis_addr, &self.redis_pass)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        broker: BrokerArgs,
    }

    #[test]
    fn defaults_point_at_local_redis() {
        let cli = Cli::parse_from(["vpbot"]);
        assert!(!cli.broker.dev_logging);
        assert_eq!(cli.broker.redis_options().url(), "redis://localhost:6379/0");
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from([
            "vpbot",
            "--redis-addr",
            "redis.internal:6380",
            "--redis-pass",
            "s3cret",
            "--dev-logging",
        ]);
        assert!(cli.broker.dev_logging);
        assert_eq!(
            cli.broker.redis_options(),
            RedisOptions::new("redis.internal:6380", "s3cret")
        );
    }
}
