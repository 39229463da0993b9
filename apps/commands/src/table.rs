use std::collections::BTreeMap;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatCommand {
    Ack,
    Help,
}

impl ChatCommand {
    pub const ALL: [ChatCommand; 2] = [ChatCommand::Ack, ChatCommand::Help];

    /// Names the command answers to, lowercase.
    pub fn names(self) -> &'static [&'static str] {
        match self {
            ChatCommand::Ack => &["ack", "test"],
            ChatCommand::Help => &["help"],
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandTableError {
    #[error("command name `{name}` is registered for both {first:?} and {second:?}")]
    Duplicate {
        name: String,
        first: ChatCommand,
        second: ChatCommand,
    },
}

/// Name to command lookup, built once at startup.
#[derive(Debug, Clone)]
pub struct CommandTable {
    entries: BTreeMap<String, ChatCommand>,
}

impl CommandTable {
    pub fn builtin() -> Result<Self, CommandTableError> {
        Self::from_registrations(
            ChatCommand::ALL
                .iter()
                .flat_map(|cmd| cmd.names().iter().map(move |name| (*name, *cmd))),
        )
    }

    pub fn from_registrations<'a>(
        registrations: impl IntoIterator<Item = (&'a str, ChatCommand)>,
    ) -> Result<Self, CommandTableError> {
        let mut entries = BTreeMap::new();
        for (name, command) in registrations {
            let name = name.to_lowercase();
            if let Some(first) = entries.get(&name) {
                return Err(CommandTableError::Duplicate {
                    name,
                    first: *first,
                    second: command,
                });
            }
            entries.insert(name, command);
        }
        Ok(Self { entries })
    }

    pub fn lookup(&self, name: &str) -> Option<ChatCommand> {
        self.entries.get(name).copied()
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}
