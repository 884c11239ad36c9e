//! Locally declared command definition value object.

use super::{CommandIdentity, CommandRegistryDomainError, CommandType, Scope};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// A command declared by the host application.
///
/// The payload is opaque to the reconciliation engine and is forwarded
/// unchanged to the transport. An empty scope set means the command is
/// global.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandDefinition {
    name: String,
    kind: CommandType,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    scopes: BTreeSet<Scope>,
    payload: Value,
}

impl CommandDefinition {
    /// Creates a global command definition.
    ///
    /// # Errors
    ///
    /// Returns [`CommandRegistryDomainError::EmptyCommandName`] when the name
    /// is empty after trimming.
    pub fn new(
        name: impl Into<String>,
        kind: CommandType,
        payload: Value,
    ) -> Result<Self, CommandRegistryDomainError> {
        let normalized_name = name.into().trim().to_owned();
        if normalized_name.is_empty() {
            return Err(CommandRegistryDomainError::EmptyCommandName);
        }

        Ok(Self {
            name: normalized_name,
            kind,
            scopes: BTreeSet::new(),
            payload,
        })
    }

    /// Creates a global chat-input command definition.
    ///
    /// # Errors
    ///
    /// Returns [`CommandRegistryDomainError::EmptyCommandName`] when the name
    /// is empty after trimming.
    pub fn chat_input(
        name: impl Into<String>,
        payload: Value,
    ) -> Result<Self, CommandRegistryDomainError> {
        Self::new(name, CommandType::ChatInput, payload)
    }

    /// Builds a single-scope definition from values reported by the remote
    /// registry, which are trusted as-is.
    pub(crate) fn from_remote(name: &str, kind: CommandType, scope: Scope, payload: Value) -> Self {
        Self {
            name: name.to_owned(),
            kind,
            scopes: BTreeSet::from([scope]),
            payload,
        }
    }

    /// Replaces the target scopes.
    #[must_use]
    pub fn with_scopes(mut self, scopes: impl IntoIterator<Item = Scope>) -> Self {
        self.scopes = scopes.into_iter().collect();
        self
    }

    /// Adds one target scope.
    #[must_use]
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scopes.insert(scope);
        self
    }

    /// Returns the command name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the command type.
    #[must_use]
    pub const fn kind(&self) -> CommandType {
        self.kind
    }

    /// Returns the explicitly declared scopes, which may be empty.
    #[must_use]
    pub const fn declared_scopes(&self) -> &BTreeSet<Scope> {
        &self.scopes
    }

    /// Returns the scopes this definition targets, defaulting to global.
    #[must_use]
    pub fn locations(&self) -> BTreeSet<Scope> {
        if self.scopes.is_empty() {
            BTreeSet::from([Scope::Global])
        } else {
            self.scopes.clone()
        }
    }

    /// Returns `true` when the definition targets `scope`.
    #[must_use]
    pub fn targets(&self, scope: Scope) -> bool {
        if self.scopes.is_empty() {
            scope.is_global()
        } else {
            self.scopes.contains(&scope)
        }
    }

    /// Returns the opaque payload sent to the remote registry.
    #[must_use]
    pub const fn payload(&self) -> &Value {
        &self.payload
    }
}

impl CommandIdentity for CommandDefinition {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> CommandType {
        self.kind
    }

    fn locations(&self) -> BTreeSet<Scope> {
        Self::locations(self)
    }

    fn is_located_in(&self, scope: Scope) -> bool {
        self.targets(scope)
    }
}
