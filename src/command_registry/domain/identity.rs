//! Command identity and the matching rule between local and remote commands.
//!
//! A local definition and a remote entry denote the same command when their
//! names and types are equal and their locations overlap. Local definitions
//! never carry remote identifiers, so matching is structural. One
//! multi-scoped definition may match several remote entries, one per scope.

use super::{CommandType, Scope};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Anything that can be matched by [`same_command`].
pub trait CommandIdentity {
    /// Returns the command name.
    fn name(&self) -> &str;

    /// Returns the command type.
    fn kind(&self) -> CommandType;

    /// Returns every scope the command lives in; never empty.
    fn locations(&self) -> BTreeSet<Scope>;

    /// Returns `true` when `scope` is one of the command's locations.
    fn is_located_in(&self, scope: Scope) -> bool {
        self.locations().contains(&scope)
    }
}

/// Returns `true` when `left` and `right` denote the same command.
#[must_use]
pub fn same_command(left: &impl CommandIdentity, right: &impl CommandIdentity) -> bool {
    left.name() == right.name()
        && left.kind() == right.kind()
        && !left.locations().is_disjoint(&right.locations())
}

/// Returns the first candidate matching `command`.
#[must_use]
pub fn find_same<'a, T>(
    command: &impl CommandIdentity,
    candidates: impl IntoIterator<Item = &'a T>,
) -> Option<&'a T>
where
    T: CommandIdentity + 'a,
{
    candidates
        .into_iter()
        .find(|candidate| same_command(command, *candidate))
}

/// Returns every candidate matching `command`.
#[must_use]
pub fn find_all_same<'a, T>(
    command: &impl CommandIdentity,
    candidates: impl IntoIterator<Item = &'a T>,
) -> Vec<&'a T>
where
    T: CommandIdentity + 'a,
{
    candidates
        .into_iter()
        .filter(|candidate| same_command(command, *candidate))
        .collect()
}

/// Owned identity of a command, detached from its payload.
///
/// Used to carry "which commands" across task boundaries and to compare
/// command sets structurally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CommandKey {
    name: String,
    kind: CommandType,
    locations: BTreeSet<Scope>,
}

impl CommandKey {
    /// Captures the identity of any command.
    #[must_use]
    pub fn of(command: &impl CommandIdentity) -> Self {
        Self {
            name: command.name().to_owned(),
            kind: command.kind(),
            locations: command.locations(),
        }
    }
}

impl CommandIdentity for CommandKey {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> CommandType {
        self.kind
    }

    fn locations(&self) -> BTreeSet<Scope> {
        self.locations.clone()
    }

    fn is_located_in(&self, scope: Scope) -> bool {
        self.locations.contains(&scope)
    }
}
