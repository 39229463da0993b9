//! Chat commands (`!name args`) read from `discord.cmd`.

mod table;

use clap::Parser;
use tracing::{debug, trace};
use vpb_core::{
    BrokerArgs, COMMAND_PREFIX, CommandTopicPayload, Directive, FeatureHandler, InboundEnvelope,
    OutboundEnvelope,
};

pub use table::{ChatCommand, CommandTable, CommandTableError};

#[derive(Debug, Clone, Parser)]
#[command(name = "vpb-commands", about = "Answers chat commands")]
pub struct CommandsConfig {
    #[command(flatten)]
    pub broker: BrokerArgs,
}

/// Splits `!Name rest of line` into `("name", "rest of line")`.
pub fn parse_invocation(content: &str) -> Option<(String, &str)> {
    let body = content.strip_prefix(COMMAND_PREFIX)?;
    let (name, args) = match body.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (body, ""),
    };
    if name.is_empty() {
        return None;
    }
    Some((name.to_lowercase(), args))
}

pub struct ChatCommandWorker {
    table: CommandTable,
}

impl ChatCommandWorker {
    pub fn new() -> Result<Self, CommandTableError> {
        Ok(Self {
            table: CommandTable::builtin()?,
        })
    }

    fn run(&self, command: ChatCommand, msg: &InboundEnvelope) -> Vec<Directive> {
        let content = match command {
            ChatCommand::Ack => "ACK".to_string(),
            ChatCommand::Help => {
                let names: Vec<String> = self
                    .table
                    .names()
                    .map(|name| format!("{COMMAND_PREFIX}{name}"))
                    .collect();
                format!("Available commands: {}", names.join(", "))
            }
        };
        vec![OutboundEnvelope::message(&msg.channel_id, content).into()]
    }
}

impl FeatureHandler for ChatCommandWorker {
    type Input = CommandTopicPayload;

    fn name(&self) -> &'static str {
        "commands"
    }

    fn handle(&self, input: CommandTopicPayload) -> Vec<Directive> {
        let msg = match input {
            CommandTopicPayload::Chat(msg) => msg,
            CommandTopicPayload::Directive(_) => {
                trace!("gateway directive on command topic");
                return Vec::new();
            }
        };
        let Some((name, _args)) = parse_invocation(&msg.content) else {
            return Vec::new();
        };
        match self.table.lookup(&name) {
            Some(command) => {
                debug!(command = ?command, channel_id = %msg.channel_id, "running chat command");
                self.run(command, &msg)
            }
            None => {
                debug!(name = %name, "unknown chat command");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vpb_core::CommandEnvelope;

    fn chat(content: &str) -> CommandTopicPayload {
        CommandTopicPayload::Chat(InboundEnvelope {
            message_id: "M1".into(),
            channel_id: "C1".into(),
            user_id: "U1".into(),
            content: content.into(),
            has_attachments_or_embeds: false,
            is_thread: false,
        })
    }

    #[test]
    fn parses_name_and_arguments() {
        assert_eq!(parse_invocation("!ACK"), Some(("ack".into(), "")));
        assert_eq!(
            parse_invocation("!say  hello there "),
            Some(("say".into(), "hello there"))
        );
        assert_eq!(parse_invocation("!"), None);
        assert_eq!(parse_invocation("ack"), None);
    }

    #[test]
    fn ack_and_its_alias_answer_in_channel() {
        let worker = ChatCommandWorker::new().unwrap();
        for content in ["!ack", "!test extra words"] {
            assert_eq!(
                worker.handle(chat(content)),
                vec![Directive::Send(OutboundEnvelope::message("C1", "ACK"))]
            );
        }
    }

    #[test]
    fn help_lists_every_registered_name() {
        let worker = ChatCommandWorker::new().unwrap();
        let directives = worker.handle(chat("!help"));
        assert_eq!(
            directives,
            vec![Directive::Send(OutboundEnvelope::message(
                "C1",
                "Available commands: !ack, !help, !test"
            ))]
        );
    }

    #[test]
    fn unknown_names_and_directives_are_ignored() {
        let worker = ChatCommandWorker::new().unwrap();
        assert!(worker.handle(chat("!markov")).is_empty());
        let directive =
            CommandTopicPayload::Directive(CommandEnvelope::delete_message("C", "M", ""));
        assert!(worker.handle(directive).is_empty());
    }
}
