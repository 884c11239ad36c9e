//! Outcome reporting for batch reconciliation runs.

use super::ScopeReconciliationError;
use crate::command_registry::domain::{RemoteCommandEntry, Scope, StrategyKind, SyncRunId};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// A scope that was reconciled successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeSuccess {
    scope: Scope,
    strategy: StrategyKind,
    entries: Vec<RemoteCommandEntry>,
}

impl ScopeSuccess {
    /// Creates a success record.
    #[must_use]
    pub const fn new(
        scope: Scope,
        strategy: StrategyKind,
        entries: Vec<RemoteCommandEntry>,
    ) -> Self {
        Self {
            scope,
            strategy,
            entries,
        }
    }

    /// Returns the reconciled scope.
    #[must_use]
    pub const fn scope(&self) -> Scope {
        self.scope
    }

    /// Returns the strategy that was applied.
    #[must_use]
    pub const fn strategy(&self) -> StrategyKind {
        self.strategy
    }

    /// Returns the entries the remote registry reported for the scope.
    #[must_use]
    pub fn entries(&self) -> &[RemoteCommandEntry] {
        &self.entries
    }
}

/// Per-scope status line of a batch run.
#[derive(Debug, Clone, Copy)]
pub enum ScopeStatus<'a> {
    /// The scope was reconciled.
    Reconciled(&'a ScopeSuccess),
    /// The scope failed; the cause is attached.
    Failed(&'a ScopeReconciliationError),
    /// The scope was never attempted.
    Skipped(Scope),
}

impl ScopeStatus<'_> {
    /// Returns the scope this status describes.
    #[must_use]
    pub const fn scope(&self) -> Scope {
        match self {
            Self::Reconciled(success) => success.scope(),
            Self::Failed(failure) => failure.scope(),
            Self::Skipped(scope) => *scope,
        }
    }
}

/// Aggregate result of a batch run.
///
/// Scopes already applied remotely are always listed, whatever happened to
/// the rest of the run.
#[derive(Debug, Clone)]
pub struct SyncReport {
    run_id: SyncRunId,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    succeeded: Vec<ScopeSuccess>,
    failures: Vec<ScopeReconciliationError>,
    skipped: Vec<Scope>,
}

impl SyncReport {
    pub(crate) const fn start(run_id: SyncRunId, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id,
            started_at,
            finished_at: started_at,
            succeeded: Vec::new(),
            failures: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub(crate) fn record_success(&mut self, success: ScopeSuccess) {
        self.succeeded.push(success);
    }

    pub(crate) fn record_failure(&mut self, failure: ScopeReconciliationError) {
        self.failures.push(failure);
    }

    pub(crate) fn record_skipped(&mut self, scopes: impl IntoIterator<Item = Scope>) {
        self.skipped.extend(scopes);
    }

    pub(crate) const fn finish(&mut self, finished_at: DateTime<Utc>) {
        self.finished_at = finished_at;
    }

    /// Returns the run's correlation identifier.
    #[must_use]
    pub const fn run_id(&self) -> SyncRunId {
        self.run_id
    }

    /// Returns when the run started.
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Returns when the run finished.
    #[must_use]
    pub const fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    /// Returns the scopes reconciled successfully, in completion order.
    #[must_use]
    pub fn succeeded(&self) -> &[ScopeSuccess] {
        &self.succeeded
    }

    /// Returns the scopes that failed, in completion order.
    #[must_use]
    pub fn failures(&self) -> &[ScopeReconciliationError] {
        &self.failures
    }

    /// Returns the scopes never attempted because the run stopped early.
    #[must_use]
    pub fn skipped(&self) -> &[Scope] {
        &self.skipped
    }

    /// Returns `true` when every planned scope was reconciled.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.skipped.is_empty()
    }

    /// Returns the reconciled scopes in scope order.
    #[must_use]
    pub fn reconciled_scopes(&self) -> Vec<Scope> {
        let mut scopes: Vec<Scope> = self.succeeded.iter().map(ScopeSuccess::scope).collect();
        scopes.sort_unstable();
        scopes
    }

    /// Returns the failed scopes in scope order.
    #[must_use]
    pub fn failed_scopes(&self) -> Vec<Scope> {
        let mut scopes: Vec<Scope> = self
            .failures
            .iter()
            .map(ScopeReconciliationError::scope)
            .collect();
        scopes.sort_unstable();
        scopes
    }

    /// Returns the failure recorded for `scope`, if any.
    #[must_use]
    pub fn failure_for(&self, scope: Scope) -> Option<&ScopeReconciliationError> {
        self.failures.iter().find(|failure| failure.scope() == scope)
    }

    /// Returns every entry applied remotely during the run, including those
    /// a failed scope applied before or despite its failure.
    pub fn entries(&self) -> impl Iterator<Item = &RemoteCommandEntry> {
        self.succeeded
            .iter()
            .flat_map(ScopeSuccess::entries)
            .chain(self.failures.iter().flat_map(ScopeReconciliationError::applied))
    }

    /// Returns one status per planned scope, in scope order.
    #[must_use]
    pub fn statuses(&self) -> Vec<ScopeStatus<'_>> {
        let mut statuses: Vec<ScopeStatus<'_>> = self
            .succeeded
            .iter()
            .map(ScopeStatus::Reconciled)
            .chain(self.failures.iter().map(ScopeStatus::Failed))
            .chain(self.skipped.iter().copied().map(ScopeStatus::Skipped))
            .collect();
        statuses.sort_by_key(ScopeStatus::scope);
        statuses
    }
}

/// A fail-fast batch stopped on its first scope failure.
///
/// Scopes reconciled before the failure stay applied remotely; they are
/// listed in [`BatchAborted::partial`].
#[derive(Debug, Clone, Error)]
#[error("batch run {} aborted: {cause}", .partial.run_id())]
pub struct BatchAborted {
    #[source]
    cause: ScopeReconciliationError,
    partial: Box<SyncReport>,
}

impl BatchAborted {
    pub(crate) fn new(cause: ScopeReconciliationError, partial: SyncReport) -> Self {
        Self {
            cause,
            partial: Box::new(partial),
        }
    }

    /// Returns the failure that stopped the run.
    #[must_use]
    pub const fn cause(&self) -> &ScopeReconciliationError {
        &self.cause
    }

    /// Returns what the run achieved before stopping.
    #[must_use]
    pub fn partial(&self) -> &SyncReport {
        &self.partial
    }

    /// Consumes the error and returns the partial report.
    #[must_use]
    pub fn into_partial(self) -> SyncReport {
        *self.partial
    }
}
