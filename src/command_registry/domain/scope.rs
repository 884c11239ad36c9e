//! Scope values partitioning the remote command namespace.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a group (for example a guild) that owns scoped commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(u64);

impl GroupId {
    /// Wraps a raw group identifier.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw group identifier.
    #[must_use]
    pub const fn into_inner(self) -> u64 {
        self.0
    }
}

impl From<u64> for GroupId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Target of a command registration: global, or a single group.
///
/// `Global` orders before every group so that batch runs visit it first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Commands visible everywhere.
    Global,
    /// Commands registered for one group only.
    Group(GroupId),
}

impl Scope {
    /// Creates a group scope from a raw identifier.
    #[must_use]
    pub const fn group(value: u64) -> Self {
        Self::Group(GroupId::new(value))
    }

    /// Returns `true` for the global scope.
    #[must_use]
    pub const fn is_global(self) -> bool {
        matches!(self, Self::Global)
    }

    /// Returns the group identifier, or `None` for the global scope.
    #[must_use]
    pub const fn group_id(self) -> Option<GroupId> {
        match self {
            Self::Global => None,
            Self::Group(group_id) => Some(group_id),
        }
    }
}

impl From<GroupId> for Scope {
    fn from(value: GroupId) -> Self {
        Self::Group(value)
    }
}

impl From<Option<GroupId>> for Scope {
    fn from(value: Option<GroupId>) -> Self {
        value.map_or(Self::Global, Self::Group)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => formatter.write_str("global"),
            Self::Group(group_id) => write!(formatter, "group {group_id}"),
        }
    }
}
