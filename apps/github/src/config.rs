use std::net::SocketAddr;

use clap::Parser;
use vpb_core::BrokerArgs;

#[derive(Debug, Clone, Parser)]
#[command(name = "vpb-github", about = "Relays failing CI runs into a channel")]
pub struct GithubConfig {
    #[command(flatten)]
    pub broker: BrokerArgs,

    /// The ID of the channel CI failures are posted to.
    #[arg(long)]
    pub channel_id: String,

    /// The ID of the role to mention.
    #[arg(long)]
    pub role_id: String,

    /// Port to listen for webhooks on.
    #[arg(long, default_value_t = 8080)]
    pub http_port: u16,

    /// Shared secret configured on the GitHub webhook.
    #[arg(long, env = "GITHUB_WEBHOOK_SECRET", hide_env_values = true)]
    pub webhook_secret: Option<String>,

    /// Only failures on this branch are reported.
    #[arg(long, default_value = "master")]
    pub branch: String,
}

impl GithubConfig {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.http_port))
    }
}
