//! Topic names shared by the gateway and every feature worker.

/// Prefix of the per-channel inbound topics.
pub const MESSAGE_TOPIC_PREFIX: &str = "discord.msg.";
/// Pattern matching every per-channel inbound topic.
pub const MESSAGE_TOPIC_WILDCARD: &str = "discord.msg.*";
/// Outbound sends, edits, replies and DMs drained by the gateway.
pub const OUTBOUND_TOPIC: &str = "discord.out";
/// Administrative commands for the gateway, and `!`-prefixed chat messages.
pub const COMMAND_TOPIC: &str = "discord.cmd";
/// Reserved for process-to-process chatter; nothing publishes here yet.
pub const GOSSIP_TOPIC: &str = "internal.gossip";

/// Suffix that turns a subscription into a pattern subscription.
pub const WILDCARD_SUFFIX: char = '*';

/// Per-channel inbound topic.
///
/// ```
/// use vpb_bus::message_topic;
///
/// assert_eq!(message_topic("1234"), "discord.msg.1234");
/// ```
pub fn message_topic(channel_id: &str) -> String {
    format!("{MESSAGE_TOPIC_PREFIX}{channel_id}")
}

/// Whether `topic` must be subscribed as a pattern rather than an exact name.
pub fn is_pattern(topic: &str) -> bool {
    topic.ends_with(WILDCARD_SUFFIX)
}

/// Matches a concrete topic against an exact name or a trailing-wildcard pattern.
///
/// ```
/// use vpb_bus::topic_matches;
///
/// assert!(topic_matches("discord.msg.*", "discord.msg.42"));
/// assert!(!topic_matches("discord.msg.*", "discord.out"));
/// assert!(topic_matches("discord.out", "discord.out"));
/// ```
pub fn topic_matches(pattern: &str, topic: &str) -> bool {
    match pattern.strip_suffix(WILDCARD_SUFFIX) {
        Some(prefix) => topic.starts_with(prefix),
        None => pattern == topic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_covers_message_topics_only() {
        assert!(is_pattern(MESSAGE_TOPIC_WILDCARD));
        assert!(!is_pattern(OUTBOUND_TOPIC));
        assert!(topic_matches(MESSAGE_TOPIC_WILDCARD, &message_topic("C1")));
        assert!(!topic_matches(MESSAGE_TOPIC_WILDCARD, COMMAND_TOPIC));
        assert!(!topic_matches(OUTBOUND_TOPIC, COMMAND_TOPIC));
    }

    #[test]
    fn exact_topics_do_not_prefix_match() {
        assert!(!topic_matches(&message_topic("1"), &message_topic("12")));
    }
}
