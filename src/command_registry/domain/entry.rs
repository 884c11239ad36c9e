//! Remote command entry value object.

use super::{CommandDefinition, CommandIdentity, CommandType, RemoteCommandId, Scope};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// A command as currently registered with the remote service.
///
/// Entries are only ever produced from fetch, overwrite or upsert responses,
/// so they carry the server-assigned identifier and belong to exactly one
/// scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCommandEntry {
    id: RemoteCommandId,
    name: String,
    kind: CommandType,
    scope: Scope,
    payload: Value,
}

impl RemoteCommandEntry {
    /// Creates an entry from a remote registry response.
    #[must_use]
    pub fn new(
        id: RemoteCommandId,
        name: impl Into<String>,
        kind: CommandType,
        scope: Scope,
        payload: Value,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            scope,
            payload,
        }
    }

    /// Returns the server-assigned identifier.
    #[must_use]
    pub const fn id(&self) -> RemoteCommandId {
        self.id
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

    /// Returns the scope the entry is registered in.
    #[must_use]
    pub const fn scope(&self) -> Scope {
        self.scope
    }

    /// Returns the payload reported by the remote registry.
    #[must_use]
    pub const fn payload(&self) -> &Value {
        &self.payload
    }

    /// Converts the entry into a definition targeting only its own scope, so
    /// that it can be re-sent in a bulk overwrite.
    #[must_use]
    pub fn to_definition(&self) -> CommandDefinition {
        CommandDefinition::from_remote(&self.name, self.kind, self.scope, self.payload.clone())
    }
}

impl CommandIdentity for RemoteCommandEntry {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> CommandType {
        self.kind
    }

    fn locations(&self) -> BTreeSet<Scope> {
        BTreeSet::from([self.scope])
    }

    fn is_located_in(&self, scope: Scope) -> bool {
        self.scope == scope
    }
}
