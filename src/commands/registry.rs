//! Static command registry

use serde::{Deserialize, Serialize};

/// Logical identifier of a voice command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommandId {
    Home,
    Health,
    Emergency,
    Social,
    Help,
    Medication,
    Contacts,
    /// Compound command; its phrase contains the `emergency` phrase
    CallEmergency,
}

impl CommandId {
    /// Stable identifier used on the wire and in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandId::Home => "home",
            CommandId::Health => "health",
            CommandId::Emergency => "emergency",
            CommandId::Social => "social",
            CommandId::Help => "help",
            CommandId::Medication => "medication",
            CommandId::Contacts => "contacts",
            CommandId::CallEmergency => "call-emergency",
        }
    }

    /// The spoken phrase registered for this command
    pub fn phrase(&self) -> &'static str {
        lookup()
            .iter()
            .find(|entry| entry.id == *self)
            .map(|entry| entry.phrase)
            .unwrap_or_else(|| self.as_str())
    }
}

impl std::fmt::Display for CommandId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered phrase and the command it triggers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandEntry {
    /// Lower-case phrase searched for in transcripts
    pub phrase: &'static str,
    /// Command emitted when the phrase is found
    pub id: CommandId,
}

/// Registration order is scan order.
const REGISTRY: &[CommandEntry] = &[
    CommandEntry { phrase: "home", id: CommandId::Home },
    CommandEntry { phrase: "health", id: CommandId::Health },
    CommandEntry { phrase: "emergency", id: CommandId::Emergency },
    CommandEntry { phrase: "social", id: CommandId::Social },
    CommandEntry { phrase: "help", id: CommandId::Help },
    CommandEntry { phrase: "medication", id: CommandId::Medication },
    CommandEntry { phrase: "contacts", id: CommandId::Contacts },
    CommandEntry { phrase: "call emergency", id: CommandId::CallEmergency },
];

/// Return the fixed, ordered command vocabulary
pub fn lookup() -> &'static [CommandEntry] {
    REGISTRY
}
