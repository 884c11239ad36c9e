//! Policies selecting how reconciliation reads and writes remote state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How eagerly a resolution refreshes the cache before answering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Staleness {
    /// Never call the network; results may be stale or missing.
    CacheOnly,
    /// Call the network only when the cache lookup misses.
    #[default]
    FillOnMiss,
    /// Fetch first, unconditionally.
    AlwaysRefresh,
}

/// Strategy applied to each scope of a batch run.
///
/// "Avoid deletions" and "just delete" are separate variants, so the two can
/// never be requested together.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStrategy {
    /// Bulk-overwrite each scope with exactly its declared commands.
    #[default]
    Overwrite,
    /// Upsert each declared command individually; never delete anything.
    Upsert,
    /// Remove every remote command from each scope.
    Wipe,
}

/// Which scopes a declared-commands batch visits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchMode {
    /// Only scopes with at least one local definition.
    #[default]
    OnlyDeclaredScopes,
    /// Declared scopes, plus a wipe of every remote scope with no local
    /// definitions.
    AlsoClearUndeclaredScopes,
}

/// What a batch does when one scope fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Stop scheduling further scopes after the first failure.
    FailFast,
    /// Record the failure and carry on with the remaining scopes.
    #[default]
    ContinueOnError,
}

/// The per-scope operation that produced a batch outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Full bulk overwrite.
    Overwrite,
    /// Individual upserts.
    Upsert,
    /// Bulk overwrite with nothing.
    Wipe,
    /// Surgical removal of named commands.
    Remove,
    /// Cache refresh from the remote registry.
    Fetch,
}

impl StrategyKind {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Overwrite => "overwrite",
            Self::Upsert => "upsert",
            Self::Wipe => "wipe",
            Self::Remove => "remove",
            Self::Fetch => "fetch",
        }
    }
}

impl From<SyncStrategy> for StrategyKind {
    fn from(value: SyncStrategy) -> Self {
        match value {
            SyncStrategy::Overwrite => Self::Overwrite,
            SyncStrategy::Upsert => Self::Upsert,
            SyncStrategy::Wipe => Self::Wipe,
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}
