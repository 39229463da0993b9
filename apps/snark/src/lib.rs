use clap::Parser;
use rand::seq::IndexedRandom;
use regex::Regex;
use tracing::debug;
use vpb_core::{BrokerArgs, Directive, FeatureHandler, InboundEnvelope, OutboundEnvelope};

pub const COMEBACKS: &[&str] = &[
    "Well if you wouldn't keep breaking it, I wouldn't have to yell at you!",
    "NO! YOU SHURRUP! I HATE U!",
    "When pigs fly",
    "Can you you stop breaking things then? hmm? HMMM? >:|",
    "Oh I'm sorry mister, I'm only pointing out __**your**__ stupid mistakes :)",
    "Stop yelling, that is __**MY**__ job!",
];

#[derive(Debug, Clone, Parser)]
#[command(name = "vpb-snark", about = "Talks back in one channel")]
pub struct SnarkConfig {
    #[command(flatten)]
    pub broker: BrokerArgs,

    /// The ID of the channel to listen in.
    #[arg(long)]
    pub channel_id: String,
}

pub struct Snark {
    trigger: Regex,
}

impl Snark {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            trigger: Regex::new("(?i)shurrup")?,
        })
    }
}

impl FeatureHandler for Snark {
    type Input = InboundEnvelope;

    fn name(&self) -> &'static str {
        "snark"
    }

    fn handle(&self, msg: InboundEnvelope) -> Vec<Directive> {
        if msg.is_thread || !self.trigger.is_match(&msg.content) {
            return Vec::new();
        }
        let Some(comeback) = COMEBACKS.choose(&mut rand::rng()) else {
            return Vec::new();
        };
        debug!(message_id = %msg.message_id, "snarking back");
        vec![OutboundEnvelope::reply(msg.channel_id, msg.message_id, *comeback).into()]
    }
}
