//! Polices a showcase channel: every top-level post needs a link or an
//! attachment. Posts without either are deleted and the author is told why by
//! DM.

use clap::Parser;
use regex::Regex;
use tracing::info;
use vpb_core::{
    BrokerArgs, CommandEnvelope, Directive, FeatureHandler, InboundEnvelope, OutboundEnvelope,
};

/// Scheme-prefixed links, or anything starting like `word.` (bare domains).
const URL_PATTERN: &str = r"(?:(?:https?|ftp)://|\b[a-z\d]+\.)[^\s<>]*";

pub const DELETION_NOTICE: &str = "I've deleted your recent message in our showcase channel.\n\
Showcase messages require that either you include a link or a picture/file in your message, \
if you're trying to discuss a posted showcase, please either start a thread or visit the \
showcase-banter channel\n\
If you believe your message has been wrongfully deleted, please contact a mod.";

#[derive(Debug, Clone, Parser)]
#[command(name = "vpb-showcase", about = "Moderates a showcase channel")]
pub struct ShowcaseConfig {
    #[command(flatten)]
    pub broker: BrokerArgs,

    /// The ID of the channel to moderate as a showcase channel.
    #[arg(long)]
    pub channel_id: String,
}

pub struct ShowcaseModerator {
    url: Regex,
}

impl ShowcaseModerator {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            url: Regex::new(URL_PATTERN)?,
        })
    }

    pub fn has_url(&self, content: &str) -> bool {
        self.url.is_match(content)
    }
}

impl FeatureHandler for ShowcaseModerator {
    type Input = InboundEnvelope;

    fn name(&self) -> &'static str {
        "showcase"
    }

    fn handle(&self, msg: InboundEnvelope) -> Vec<Directive> {
        if msg.is_thread {
            return Vec::new();
        }

        let has_url = self.has_url(&msg.content);
        if has_url || msg.has_attachments_or_embeds {
            return Vec::new();
        }

        info!(
            channel_id = %msg.channel_id,
            message_id = %msg.message_id,
            user_id = %msg.user_id,
            "removing showcase post without link or attachment"
        );
        let reason = format!(
            "failed showcase checks; url: {has_url} attachembeds: {}",
            msg.has_attachments_or_embeds
        );
        vec![
            OutboundEnvelope::direct(&msg.user_id, DELETION_NOTICE).into(),
            CommandEnvelope::delete_message(msg.channel_id, msg.message_id, reason).into(),
        ]
    }
}
