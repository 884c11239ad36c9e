//! Error types for command registry domain validation and parsing.

use super::{CommandType, Scope};
use thiserror::Error;

/// Errors returned while constructing command registry domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandRegistryDomainError {
    /// The command name is empty after trimming.
    #[error("command name must not be empty")]
    EmptyCommandName,

    /// Two local definitions share a name and type in at least one scope.
    #[error("duplicate {kind} command '{name}' declared for {scope}")]
    DuplicateDefinition {
        /// Command name shared by both definitions.
        name: String,
        /// Command type shared by both definitions.
        kind: CommandType,
        /// First scope in which the definitions collide.
        scope: Scope,
    },
}

/// Error returned while parsing a command type from its canonical form.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown command type: {0}")]
pub struct ParseCommandTypeError(pub String);
