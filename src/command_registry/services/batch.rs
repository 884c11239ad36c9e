//! Batch orchestration of per-scope reconciliation.

use super::{
    BatchAborted, ReconciliationService, ScopeReconciliationError, ScopeSuccess, SyncError,
    SyncReport, SyncResult,
};
use crate::command_registry::{
    domain::{
        BatchMode, CommandDefinition, CommandIdentity, CommandKey, ErrorPolicy, RemoteCommandEntry,
        Scope, StrategyKind, SyncRunId, SyncStrategy,
    },
    ports::{CommandTransport, ScopeDirectory},
};
use mockable::Clock;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::task::{Id as TaskId, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Result of a batch run.
///
/// `Ok` carries the report of a run that was not aborted; it may still list
/// failures under [`ErrorPolicy::ContinueOnError`]. `Err` is only produced
/// under [`ErrorPolicy::FailFast`].
pub type BatchResult = Result<SyncReport, BatchAborted>;

#[derive(Debug)]
enum ScopeOperation {
    Overwrite(Vec<CommandDefinition>),
    Upsert(Vec<CommandDefinition>),
    Wipe,
    Remove(Vec<CommandKey>),
    Fetch,
}

impl ScopeOperation {
    fn for_strategy(strategy: SyncStrategy, definitions: Vec<CommandDefinition>) -> Self {
        match strategy {
            SyncStrategy::Overwrite => Self::Overwrite(definitions),
            SyncStrategy::Upsert => Self::Upsert(definitions),
            SyncStrategy::Wipe => Self::Wipe,
        }
    }

    const fn kind(&self) -> StrategyKind {
        match self {
            Self::Overwrite(_) => StrategyKind::Overwrite,
            Self::Upsert(_) => StrategyKind::Upsert,
            Self::Wipe => StrategyKind::Wipe,
            Self::Remove(_) => StrategyKind::Remove,
            Self::Fetch => StrategyKind::Fetch,
        }
    }
}

#[derive(Debug)]
struct ScopeJob {
    scope: Scope,
    operation: ScopeOperation,
}

impl ScopeJob {
    const fn new(scope: Scope, operation: ScopeOperation) -> Self {
        Self { scope, operation }
    }

    const fn wipe(scope: Scope) -> Self {
        Self::new(scope, ScopeOperation::Wipe)
    }
}

/// Drives reconciliation across many scopes.
///
/// Each planned scope becomes one job. At most
/// [`SyncConfig::concurrency`](super::SyncConfig::concurrency) jobs run at
/// once; jobs for the same scope are additionally serialised by the
/// engine's per-scope locks. A failed scope never rolls back scopes that
/// already succeeded.
pub struct BatchSyncService<T, D, C>
where
    T: CommandTransport + 'static,
    D: ScopeDirectory + 'static,
    C: Clock + Send + Sync,
{
    engine: Arc<ReconciliationService<T, D>>,
    clock: Arc<C>,
    cancellation: CancellationToken,
}

impl<T, D, C> BatchSyncService<T, D, C>
where
    T: CommandTransport + 'static,
    D: ScopeDirectory + 'static,
    C: Clock + Send + Sync,
{
    /// Creates a batch service over a shared engine.
    #[must_use]
    pub fn new(engine: Arc<ReconciliationService<T, D>>, clock: Arc<C>) -> Self {
        Self {
            engine,
            clock,
            cancellation: CancellationToken::new(),
        }
    }

    /// Replaces the cancellation token, typically with a child of an
    /// application-wide shutdown token.
    #[must_use]
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Returns the engine the batches run against.
    #[must_use]
    pub const fn engine(&self) -> &Arc<ReconciliationService<T, D>> {
        &self.engine
    }

    /// Returns a handle that stops runs from starting further scopes.
    ///
    /// Scopes already in flight finish; the rest are reported as skipped.
    /// Once cancelled, every later run skips all of its scopes.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Applies `strategy` to every scope with declared commands.
    ///
    /// With [`BatchMode::AlsoClearUndeclaredScopes`], every known remote
    /// scope without declarations is wiped in the same run.
    ///
    /// # Errors
    ///
    /// Returns [`BatchAborted`] under [`ErrorPolicy::FailFast`] once a scope
    /// fails.
    pub async fn sync_all_declared(
        &self,
        strategy: SyncStrategy,
        mode: BatchMode,
        policy: ErrorPolicy,
    ) -> BatchResult {
        let declared = self.engine.local_definitions();
        let declared_scopes = declared.declared_scopes();
        let mut jobs: Vec<ScopeJob> = declared_scopes
            .iter()
            .map(|&scope| {
                ScopeJob::new(
                    scope,
                    ScopeOperation::for_strategy(strategy, declared.definitions_for(scope)),
                )
            })
            .collect();
        if mode == BatchMode::AlsoClearUndeclaredScopes {
            jobs.extend(
                self.undeclared_scopes(&declared_scopes)
                    .into_iter()
                    .map(ScopeJob::wipe),
            );
        }
        self.run("sync_all_declared", jobs, policy).await
    }

    /// Applies `strategy` to the global scope and every operated group.
    ///
    /// Operated scopes without declarations are overwritten with nothing
    /// under [`SyncStrategy::Overwrite`], and left alone under
    /// [`SyncStrategy::Upsert`].
    ///
    /// # Errors
    ///
    /// Returns [`BatchAborted`] under [`ErrorPolicy::FailFast`] once a scope
    /// fails.
    pub async fn sync_all_operated(
        &self,
        strategy: SyncStrategy,
        policy: ErrorPolicy,
    ) -> BatchResult {
        let declared = self.engine.local_definitions();
        let jobs: Vec<ScopeJob> = self
            .engine
            .operated_scopes()
            .into_iter()
            .filter_map(|scope| {
                let definitions = declared.definitions_for(scope);
                (strategy != SyncStrategy::Upsert || !definitions.is_empty()).then(|| {
                    ScopeJob::new(scope, ScopeOperation::for_strategy(strategy, definitions))
                })
            })
            .collect();
        self.run("sync_all_operated", jobs, policy).await
    }

    /// Wipes every known remote scope that has no declared commands.
    ///
    /// # Errors
    ///
    /// Returns [`BatchAborted`] under [`ErrorPolicy::FailFast`] once a scope
    /// fails.
    pub async fn clear_undeclared(&self, policy: ErrorPolicy) -> BatchResult {
        let declared_scopes = self.engine.declared_scopes();
        let jobs: Vec<ScopeJob> = self
            .undeclared_scopes(&declared_scopes)
            .into_iter()
            .map(ScopeJob::wipe)
            .collect();
        self.run("clear_undeclared", jobs, policy).await
    }

    /// Reconciles only the scopes touched by `definitions`.
    ///
    /// [`SyncStrategy::Overwrite`] writes the full declared set of each
    /// touched scope, [`SyncStrategy::Upsert`] upserts just the given
    /// definitions, and [`SyncStrategy::Wipe`] empties the touched scopes.
    ///
    /// # Errors
    ///
    /// Returns [`BatchAborted`] under [`ErrorPolicy::FailFast`] once a scope
    /// fails.
    pub async fn sync_given(
        &self,
        definitions: &[CommandDefinition],
        strategy: SyncStrategy,
        policy: ErrorPolicy,
    ) -> BatchResult {
        let declared = self.engine.local_definitions();
        let jobs: Vec<ScopeJob> = touched_scopes(definitions)
            .into_iter()
            .map(|scope| {
                let operation = match strategy {
                    SyncStrategy::Overwrite => {
                        ScopeOperation::Overwrite(declared.definitions_for(scope))
                    }
                    SyncStrategy::Upsert => {
                        ScopeOperation::Upsert(targeting(definitions, scope))
                    }
                    SyncStrategy::Wipe => ScopeOperation::Wipe,
                };
                ScopeJob::new(scope, operation)
            })
            .collect();
        self.run("sync_given", jobs, policy).await
    }

    /// Upserts each given definition into each of its locations.
    ///
    /// # Errors
    ///
    /// Returns [`BatchAborted`] under [`ErrorPolicy::FailFast`] once a scope
    /// fails.
    pub async fn sync_individually(
        &self,
        definitions: &[CommandDefinition],
        policy: ErrorPolicy,
    ) -> BatchResult {
        let jobs: Vec<ScopeJob> = touched_scopes(definitions)
            .into_iter()
            .map(|scope| {
                ScopeJob::new(scope, ScopeOperation::Upsert(targeting(definitions, scope)))
            })
            .collect();
        self.run("sync_individually", jobs, policy).await
    }

    /// Surgically removes the given commands from every scope they live in.
    ///
    /// Other commands registered in those scopes are kept.
    ///
    /// # Errors
    ///
    /// Returns [`BatchAborted`] under [`ErrorPolicy::FailFast`] once a scope
    /// fails.
    pub async fn unsync_given<K>(&self, commands: &[K], policy: ErrorPolicy) -> BatchResult
    where
        K: CommandIdentity + Sync,
    {
        let keys: Vec<CommandKey> = commands.iter().map(CommandKey::of).collect();
        let scopes: BTreeSet<Scope> = keys.iter().flat_map(CommandKey::locations).collect();
        let jobs: Vec<ScopeJob> = scopes
            .into_iter()
            .map(|scope| {
                let located: Vec<CommandKey> = keys
                    .iter()
                    .filter(|key| key.is_located_in(scope))
                    .cloned()
                    .collect();
                ScopeJob::new(scope, ScopeOperation::Remove(located))
            })
            .collect();
        self.run("unsync_given", jobs, policy).await
    }

    /// Re-fetches the global scope and every operated group into the cache.
    ///
    /// # Errors
    ///
    /// Returns [`BatchAborted`] under [`ErrorPolicy::FailFast`] once a scope
    /// fails.
    pub async fn refresh_all(&self, policy: ErrorPolicy) -> BatchResult {
        let jobs: Vec<ScopeJob> = self
            .engine
            .operated_scopes()
            .into_iter()
            .map(|scope| ScopeJob::new(scope, ScopeOperation::Fetch))
            .collect();
        self.run("refresh_all", jobs, policy).await
    }

    fn undeclared_scopes(&self, declared: &BTreeSet<Scope>) -> Vec<Scope> {
        let mut known = self.engine.cached_scopes();
        known.extend(self.engine.operated_scopes());
        known.difference(declared).copied().collect()
    }

    async fn run(
        &self,
        operation: &'static str,
        jobs: Vec<ScopeJob>,
        policy: ErrorPolicy,
    ) -> BatchResult {
        let run_id = SyncRunId::new();
        let limit = self.engine.config().concurrency();
        let stop = self.cancellation.child_token();
        let mut report = SyncReport::start(run_id, self.clock.utc());
        let mut abort_cause: Option<ScopeReconciliationError> = None;
        let mut in_flight: HashMap<TaskId, (Scope, StrategyKind)> = HashMap::new();
        let mut tasks: JoinSet<SyncResult<Vec<RemoteCommandEntry>>> = JoinSet::new();
        let mut queue = jobs.into_iter();

        info!(%run_id, operation, scopes = queue.len(), ?policy, limit, "starting batch");

        loop {
            while tasks.len() < limit && !stop.is_cancelled() {
                let Some(job) = queue.next() else {
                    break;
                };
                let target = (job.scope, job.operation.kind());
                let engine = Arc::clone(&self.engine);
                let handle = tasks.spawn(async move { execute(&engine, job).await });
                in_flight.insert(handle.id(), target);
            }

            let Some(joined) = tasks.join_next_with_id().await else {
                break;
            };
            let (task_id, completion) = match joined {
                Ok((task_id, outcome)) => (task_id, Ok(outcome)),
                Err(join_error) => (join_error.id(), Err(join_error.to_string())),
            };
            let Some((scope, strategy)) = in_flight.remove(&task_id) else {
                continue;
            };
            let outcome =
                completion.unwrap_or_else(|reason| Err(SyncError::TaskFailed { scope, reason }));

            match outcome {
                Ok(entries) => {
                    info!(%run_id, %scope, %strategy, count = entries.len(), "scope reconciled");
                    report.record_success(ScopeSuccess::new(scope, strategy, entries));
                }
                Err(source) => {
                    let failure = ScopeReconciliationError::new(scope, strategy, source);
                    warn!(
                        %run_id,
                        %scope,
                        %strategy,
                        applied = failure.applied().len(),
                        error = %failure.cause(),
                        "scope failed"
                    );
                    if policy == ErrorPolicy::FailFast && abort_cause.is_none() {
                        stop.cancel();
                        abort_cause = Some(failure.clone());
                    }
                    report.record_failure(failure);
                }
            }
        }

        report.record_skipped(queue.map(|job| job.scope));
        report.finish(self.clock.utc());
        info!(
            %run_id,
            operation,
            succeeded = report.succeeded().len(),
            failed = report.failures().len(),
            skipped = report.skipped().len(),
            "batch finished"
        );

        if let Some(cause) = abort_cause {
            return Err(BatchAborted::new(cause, report));
        }
        Ok(report)
    }
}

async fn execute<T, D>(
    engine: &ReconciliationService<T, D>,
    job: ScopeJob,
) -> SyncResult<Vec<RemoteCommandEntry>>
where
    T: CommandTransport,
    D: ScopeDirectory,
{
    let scope = job.scope;
    match job.operation {
        ScopeOperation::Overwrite(definitions) => engine.sync_scope(scope, &definitions).await,
        ScopeOperation::Upsert(definitions) => engine.upsert_into_scope(scope, &definitions).await,
        ScopeOperation::Wipe => engine.unsync_scope(scope).await.map(|()| Vec::new()),
        ScopeOperation::Remove(commands) => engine.remove_from_scope(scope, &commands).await,
        ScopeOperation::Fetch => engine.fetch_scope(scope).await,
    }
}

fn touched_scopes(definitions: &[CommandDefinition]) -> BTreeSet<Scope> {
    definitions
        .iter()
        .flat_map(CommandDefinition::locations)
        .collect()
}

fn targeting(definitions: &[CommandDefinition], scope: Scope) -> Vec<CommandDefinition> {
    definitions
        .iter()
        .filter(|definition| definition.targets(scope))
        .cloned()
        .collect()
}
