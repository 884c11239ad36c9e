//! Service-level error types for reconciliation.

use crate::command_registry::{
    domain::{CommandRegistryDomainError, RemoteCommandEntry, Scope, StrategyKind},
    ports::TransportError,
};
use thiserror::Error;

/// Errors returned by single-scope reconciliation operations.
#[derive(Debug, Clone, Error)]
pub enum SyncError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] CommandRegistryDomainError),

    /// The remote registry call failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Some individual upserts in a scope failed. The others were applied
    /// remotely and cached.
    #[error("{} upserts failed, {} applied", .rejected.len(), .applied.len())]
    UpsertsRejected {
        /// Entries upserted successfully.
        applied: Vec<RemoteCommandEntry>,
        /// Definitions the remote registry refused, in submission order.
        rejected: Vec<RejectedUpsert>,
    },

    /// A definition was sent to a scope it does not target.
    #[error("command '{name}' does not target {scope}")]
    DefinitionOutOfScope {
        /// Name of the offending definition.
        name: String,
        /// Scope being reconciled.
        scope: Scope,
    },

    /// A batch worker ended without reporting an outcome.
    #[error("reconciliation task for {scope} ended abnormally: {reason}")]
    TaskFailed {
        /// Scope the task was reconciling.
        scope: Scope,
        /// Join failure description.
        reason: String,
    },
}

impl SyncError {
    /// Returns the transport failure behind this error, if any.
    #[must_use]
    pub fn transport(&self) -> Option<&TransportError> {
        match self {
            Self::Transport(source) => Some(source),
            Self::UpsertsRejected { rejected, .. } => rejected.first().map(RejectedUpsert::cause),
            Self::Domain(_) | Self::DefinitionOutOfScope { .. } | Self::TaskFailed { .. } => None,
        }
    }

    /// Returns the entries applied remotely before or despite this failure.
    #[must_use]
    pub const fn applied(&self) -> &[RemoteCommandEntry] {
        match self {
            Self::UpsertsRejected { applied, .. } => applied.as_slice(),
            Self::Domain(_)
            | Self::Transport(_)
            | Self::DefinitionOutOfScope { .. }
            | Self::TaskFailed { .. } => &[],
        }
    }
}

/// One definition the remote registry refused to upsert.
#[derive(Debug, Clone, Error)]
#[error("upserting command '{name}' failed: {source}")]
pub struct RejectedUpsert {
    name: String,
    source: TransportError,
}

impl RejectedUpsert {
    /// Creates a rejection record.
    #[must_use]
    pub const fn new(name: String, source: TransportError) -> Self {
        Self { name, source }
    }

    /// Returns the name of the refused command.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the transport failure.
    #[must_use]
    pub const fn cause(&self) -> &TransportError {
        &self.source
    }
}

/// Result type for reconciliation operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Failure of one scope within a batch run.
#[derive(Debug, Clone, Error)]
#[error("{strategy} of {scope} failed: {source}")]
pub struct ScopeReconciliationError {
    scope: Scope,
    strategy: StrategyKind,
    source: SyncError,
}

impl ScopeReconciliationError {
    /// Creates a scope failure.
    #[must_use]
    pub const fn new(scope: Scope, strategy: StrategyKind, source: SyncError) -> Self {
        Self {
            scope,
            strategy,
            source,
        }
    }

    /// Returns the scope that failed.
    #[must_use]
    pub const fn scope(&self) -> Scope {
        self.scope
    }

    /// Returns the strategy that was being applied.
    #[must_use]
    pub const fn strategy(&self) -> StrategyKind {
        self.strategy
    }

    /// Returns the underlying cause.
    #[must_use]
    pub const fn cause(&self) -> &SyncError {
        &self.source
    }

    /// Returns the entries the scope had applied when it failed.
    #[must_use]
    pub const fn applied(&self) -> &[RemoteCommandEntry] {
        self.source.applied()
    }
}
