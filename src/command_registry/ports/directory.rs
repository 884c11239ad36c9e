//! Port describing where the application currently operates.

use crate::command_registry::domain::{GroupId, Scope};
use std::collections::BTreeSet;

/// Source of the groups the host application is currently a member of.
pub trait ScopeDirectory: Send + Sync {
    /// Returns the groups the application operates in.
    fn operated_groups(&self) -> Vec<GroupId>;

    /// Returns the global scope plus every operated group.
    fn operated_scopes(&self) -> BTreeSet<Scope> {
        std::iter::once(Scope::Global)
            .chain(self.operated_groups().into_iter().map(Scope::Group))
            .collect()
    }
}
