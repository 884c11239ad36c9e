//! Fixed scope directory adapter.

use crate::command_registry::{domain::GroupId, ports::ScopeDirectory};
use std::sync::{Arc, RwLock};

/// Scope directory backed by an explicit, replaceable list of groups.
#[derive(Debug, Clone, Default)]
pub struct StaticScopeDirectory {
    groups: Arc<RwLock<Vec<GroupId>>>,
}

impl StaticScopeDirectory {
    /// Creates a directory reporting the given groups.
    #[must_use]
    pub fn new(groups: impl IntoIterator<Item = GroupId>) -> Self {
        Self {
            groups: Arc::new(RwLock::new(groups.into_iter().collect())),
        }
    }

    /// Records that the application joined a group.
    pub fn join(&self, group: GroupId) {
        let mut groups = self
            .groups
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if !groups.contains(&group) {
            groups.push(group);
        }
    }

    /// Records that the application left a group.
    pub fn leave(&self, group: GroupId) {
        self.groups
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .retain(|known| *known != group);
    }
}

impl ScopeDirectory for StaticScopeDirectory {
    fn operated_groups(&self) -> Vec<GroupId> {
        self.groups
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}
