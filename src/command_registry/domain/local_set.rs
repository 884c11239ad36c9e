//! The set of commands declared by the host application.

use super::{CommandDefinition, CommandIdentity, CommandRegistryDomainError, Scope, find_same};
use std::collections::{BTreeSet, HashSet};

/// Validated collection of local command definitions.
///
/// No two definitions may share a name and type in any scope; the remote
/// registry would only ever keep one of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalCommandSet {
    definitions: Vec<CommandDefinition>,
}

impl LocalCommandSet {
    /// Creates an empty set.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            definitions: Vec::new(),
        }
    }

    /// Validates and collects definitions.
    ///
    /// # Errors
    ///
    /// Returns [`CommandRegistryDomainError::DuplicateDefinition`] when two
    /// definitions collide in some scope.
    pub fn new(
        definitions: impl IntoIterator<Item = CommandDefinition>,
    ) -> Result<Self, CommandRegistryDomainError> {
        let mut seen = HashSet::new();
        let mut collected = Vec::new();
        for definition in definitions {
            for scope in definition.locations() {
                let slot = (definition.kind(), scope, definition.name().to_owned());
                if !seen.insert(slot) {
                    return Err(CommandRegistryDomainError::DuplicateDefinition {
                        name: definition.name().to_owned(),
                        kind: definition.kind(),
                        scope,
                    });
                }
            }
            collected.push(definition);
        }
        Ok(Self {
            definitions: collected,
        })
    }

    /// Returns every definition in declaration order.
    #[must_use]
    pub fn definitions(&self) -> &[CommandDefinition] {
        &self.definitions
    }

    /// Returns the number of definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Returns `true` when nothing is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Returns every scope with at least one definition.
    #[must_use]
    pub fn declared_scopes(&self) -> BTreeSet<Scope> {
        self.definitions
            .iter()
            .flat_map(CommandDefinition::locations)
            .collect()
    }

    /// Returns the definitions targeting `scope`.
    #[must_use]
    pub fn definitions_for(&self, scope: Scope) -> Vec<CommandDefinition> {
        self.definitions
            .iter()
            .filter(|definition| definition.targets(scope))
            .cloned()
            .collect()
    }

    /// Returns the declared definition that denotes the same command as
    /// `command`, if any.
    #[must_use]
    pub fn find_counterpart(&self, command: &impl CommandIdentity) -> Option<&CommandDefinition> {
        find_same(command, &self.definitions)
    }
}
