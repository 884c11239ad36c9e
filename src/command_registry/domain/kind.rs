//! Command type enumeration.

use super::ParseCommandTypeError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a registered command.
///
/// Commands of different kinds never collide, even when their names and
/// scopes are identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandType {
    /// Slash command typed into the chat input.
    ChatInput,
    /// Context-menu command invoked on a user.
    UserContext,
    /// Context-menu command invoked on a message.
    MessageContext,
}

impl CommandType {
    /// Every command type, in canonical order.
    pub const ALL: [Self; 3] = [Self::ChatInput, Self::UserContext, Self::MessageContext];

    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ChatInput => "chat_input",
            Self::UserContext => "user_context",
            Self::MessageContext => "message_context",
        }
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for CommandType {
    type Error = ParseCommandTypeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "chat_input" => Ok(Self::ChatInput),
            "user_context" => Ok(Self::UserContext),
            "message_context" => Ok(Self::MessageContext),
            _ => Err(ParseCommandTypeError(value.to_owned())),
        }
    }
}
