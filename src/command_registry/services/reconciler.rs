//! Single-scope reconciliation and resolution.

use super::{RejectedUpsert, SyncConfig, SyncError, SyncResult, locks::ScopeLocks};
use crate::command_registry::{
    cache::RegistryCache,
    domain::{
        CommandDefinition, CommandIdentity, CommandType, LocalCommandSet, RemoteCommandEntry,
        RemoteCommandId, Scope, Staleness, find_same,
    },
    ports::{CommandTransport, ScopeDirectory},
};
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Reconciliation engine for one remote command registry.
///
/// The engine owns the registry cache and the declared command set. Every
/// operation here touches a single scope (or, for resolution, the scopes a
/// definition lives in) and propagates transport errors directly. Batch
/// runs across many scopes are driven by
/// [`BatchSyncService`](super::BatchSyncService).
pub struct ReconciliationService<T, D>
where
    T: CommandTransport,
    D: ScopeDirectory,
{
    transport: Arc<T>,
    directory: Arc<D>,
    config: SyncConfig,
    cache: RegistryCache,
    locks: ScopeLocks,
    local: RwLock<LocalCommandSet>,
}

impl<T, D> ReconciliationService<T, D>
where
    T: CommandTransport,
    D: ScopeDirectory,
{
    /// Creates an engine with an empty cache and no declared commands.
    #[must_use]
    pub fn new(transport: Arc<T>, directory: Arc<D>, config: SyncConfig) -> Self {
        Self {
            transport,
            directory,
            config,
            cache: RegistryCache::new(),
            locks: ScopeLocks::default(),
            local: RwLock::new(LocalCommandSet::empty()),
        }
    }

    /// Returns the engine configuration.
    #[must_use]
    pub const fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Declares the full local command set, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Domain`] when two definitions collide.
    pub fn register_local(
        &self,
        definitions: impl IntoIterator<Item = CommandDefinition>,
    ) -> SyncResult<()> {
        let declared = LocalCommandSet::new(definitions)?;
        debug!(count = declared.len(), "registered local command set");
        *self.local.write() = declared;
        Ok(())
    }

    /// Forgets every local definition. Remote state is untouched until the
    /// next synchronisation.
    pub fn clear_local(&self) {
        *self.local.write() = LocalCommandSet::empty();
    }

    /// Returns a snapshot of the declared command set.
    #[must_use]
    pub fn local_definitions(&self) -> LocalCommandSet {
        self.local.read().clone()
    }

    /// Returns every scope with at least one local definition.
    #[must_use]
    pub fn declared_scopes(&self) -> BTreeSet<Scope> {
        self.local.read().declared_scopes()
    }

    /// Returns the local definitions targeting `scope`.
    #[must_use]
    pub fn declared_for(&self, scope: Scope) -> Vec<CommandDefinition> {
        self.local.read().definitions_for(scope)
    }

    /// Returns the global scope and every group the application operates in.
    #[must_use]
    pub fn operated_scopes(&self) -> BTreeSet<Scope> {
        self.directory.operated_scopes()
    }

    /// Returns the local definition matching a remote entry, if declared.
    #[must_use]
    pub fn resolve_to_local(&self, entry: &RemoteCommandEntry) -> Option<CommandDefinition> {
        self.local.read().find_counterpart(entry).cloned()
    }

    /// Returns the cached entry for a type, scope and name.
    #[must_use]
    pub fn lookup_cached(
        &self,
        kind: CommandType,
        scope: Scope,
        name: &str,
    ) -> Option<RemoteCommandEntry> {
        self.cache.lookup(kind, scope, name)
    }

    /// Returns the cached entry with the given remote identifier.
    #[must_use]
    pub fn cached_entry(&self, command_id: RemoteCommandId) -> Option<RemoteCommandEntry> {
        self.cache.get(command_id)
    }

    /// Returns every cached entry of `scope`.
    #[must_use]
    pub fn all_cached(&self, scope: Scope) -> Vec<RemoteCommandEntry> {
        self.cache.all_in_scope(scope)
    }

    /// Returns every cached entry across all scopes.
    #[must_use]
    pub fn all_cached_everywhere(&self) -> Vec<RemoteCommandEntry> {
        self.cache.all()
    }

    /// Returns every scope with at least one cached entry.
    #[must_use]
    pub fn cached_scopes(&self) -> BTreeSet<Scope> {
        self.cache.populated_scopes()
    }

    /// Drops cached entries of `scope`, or the whole cache for `None`.
    pub fn clear_cache(&self, scope: Option<Scope>) {
        self.cache.invalidate_scope(scope);
    }

    /// Pulls every remote command of `scope` into the cache, replacing what
    /// was cached for it.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Transport`] when the fetch fails; the cache is
    /// left unchanged.
    pub async fn fetch_scope(&self, scope: Scope) -> SyncResult<Vec<RemoteCommandEntry>> {
        let _guard = self.locks.acquire(scope).await;
        self.fetch_scope_locked(scope).await
    }

    async fn fetch_scope_locked(&self, scope: Scope) -> SyncResult<Vec<RemoteCommandEntry>> {
        let entries = self.transport.fetch_scope_commands(scope).await?;
        debug!(%scope, count = entries.len(), "fetched remote commands");
        self.cache.overwrite_scope(scope, entries.iter().cloned());
        Ok(entries)
    }

    /// Finds the remote counterpart of `definition` in `scope`.
    ///
    /// A miss is `Ok(None)`. Whether the network is consulted depends on
    /// `staleness`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Transport`] when a required fetch fails.
    pub async fn resolve(
        &self,
        definition: &CommandDefinition,
        scope: Scope,
        staleness: Staleness,
    ) -> SyncResult<Option<RemoteCommandEntry>> {
        let lookup = || self.cache.lookup(definition.kind(), scope, definition.name());
        match staleness {
            Staleness::CacheOnly => Ok(lookup()),
            Staleness::FillOnMiss => {
                if let Some(hit) = lookup() {
                    return Ok(Some(hit));
                }
                self.fetch_scope(scope).await?;
                Ok(lookup())
            }
            Staleness::AlwaysRefresh => {
                self.fetch_scope(scope).await?;
                Ok(lookup())
            }
        }
    }

    /// Resolves `definition` with the configured default staleness.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Transport`] when a required fetch fails.
    pub async fn resolve_default(
        &self,
        definition: &CommandDefinition,
        scope: Scope,
    ) -> SyncResult<Option<RemoteCommandEntry>> {
        self.resolve(definition, scope, self.config.default_staleness)
            .await
    }

    /// Resolves every definition in every one of its locations.
    ///
    /// Each distinct scope is fetched at most once per pass. Definitions that
    /// cannot be resolved are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Transport`] when a required fetch fails.
    pub async fn resolve_many(
        &self,
        definitions: &[CommandDefinition],
        staleness: Staleness,
    ) -> SyncResult<Vec<RemoteCommandEntry>> {
        let wanted: Vec<(&CommandDefinition, Scope)> = definitions
            .iter()
            .flat_map(|definition| {
                definition
                    .locations()
                    .into_iter()
                    .map(move |scope| (definition, scope))
            })
            .collect();

        if staleness == Staleness::AlwaysRefresh {
            self.fetch_each(wanted.iter().map(|(_, scope)| *scope)).await?;
        }

        let mut resolved = Vec::with_capacity(wanted.len());
        let mut missing = Vec::new();
        for (definition, scope) in wanted {
            match self.cache.lookup(definition.kind(), scope, definition.name()) {
                Some(entry) => resolved.push(entry),
                None => missing.push((definition, scope)),
            }
        }

        if staleness == Staleness::FillOnMiss && !missing.is_empty() {
            self.fetch_each(missing.iter().map(|(_, scope)| *scope)).await?;
            resolved.extend(missing.into_iter().filter_map(|(definition, scope)| {
                self.cache.lookup(definition.kind(), scope, definition.name())
            }));
        }
        Ok(resolved)
    }

    async fn fetch_each(&self, scopes: impl Iterator<Item = Scope>) -> SyncResult<()> {
        let distinct: BTreeSet<Scope> = scopes.collect();
        for scope in distinct {
            self.fetch_scope(scope).await?;
        }
        Ok(())
    }

    /// Resolves a server-assigned identifier.
    ///
    /// When a fetch is needed, the scope already known from the cache is
    /// asked first; otherwise the global scope and then every operated group
    /// are asked until one holds the command. A scope whose lookup fails is
    /// skipped. An entry the remote registry no longer has is dropped from
    /// the cache.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Transport`] with the last failure when every scope
    /// lookup fails.
    pub async fn resolve_id(
        &self,
        command_id: RemoteCommandId,
        staleness: Staleness,
    ) -> SyncResult<Option<RemoteCommandEntry>> {
        let cached = self.cache.get(command_id);
        if staleness == Staleness::CacheOnly
            || (staleness == Staleness::FillOnMiss && cached.is_some())
        {
            return Ok(cached);
        }

        let candidates: Vec<Scope> = cached.as_ref().map_or_else(
            || self.operated_scopes().into_iter().collect(),
            |entry| vec![entry.scope()],
        );
        let mut answered = false;
        let mut last_failure = None;
        for scope in candidates {
            let _guard = self.locks.acquire(scope).await;
            match self.transport.fetch_command(command_id, scope).await {
                Ok(Some(entry)) => {
                    self.cache.put([entry.clone()]);
                    return Ok(Some(entry));
                }
                Ok(None) => answered = true,
                Err(err) => {
                    warn!(%scope, %command_id, error = %err, "lookup failed, trying next scope");
                    last_failure = Some(err);
                }
            }
        }

        match last_failure {
            Some(err) if !answered => Err(err.into()),
            Some(_) => Ok(None),
            None => {
                if self.cache.remove(command_id).is_some() {
                    debug!(%command_id, "cached command no longer exists remotely");
                }
                Ok(None)
            }
        }
    }

    /// Replaces the remote contents of `scope` with exactly `definitions`.
    ///
    /// Anything registered in the scope but not listed is deleted remotely.
    /// On success the scope's cache holds exactly the returned entries.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::DefinitionOutOfScope`] before any call when a
    /// definition does not target `scope`, or [`SyncError::Transport`] when
    /// the overwrite fails.
    pub async fn sync_scope(
        &self,
        scope: Scope,
        definitions: &[CommandDefinition],
    ) -> SyncResult<Vec<RemoteCommandEntry>> {
        ensure_targets(scope, definitions)?;
        let _guard = self.locks.acquire(scope).await;
        self.overwrite_locked(scope, definitions).await
    }

    /// Overwrites `scope` with its declared definitions.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Transport`] when the overwrite fails.
    pub async fn sync_declared_scope(&self, scope: Scope) -> SyncResult<Vec<RemoteCommandEntry>> {
        let declared = self.declared_for(scope);
        self.sync_scope(scope, &declared).await
    }

    async fn overwrite_locked(
        &self,
        scope: Scope,
        definitions: &[CommandDefinition],
    ) -> SyncResult<Vec<RemoteCommandEntry>> {
        let entries = self.transport.bulk_overwrite(scope, definitions).await?;
        self.cache.overwrite_scope(scope, entries.iter().cloned());
        info!(%scope, count = entries.len(), "overwrote remote commands");
        Ok(entries)
    }

    /// Removes every remote command from `scope`.
    ///
    /// The scope's cache is invalidated even when the call fails, because
    /// the remote state is then unknown.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Transport`] when the overwrite fails.
    pub async fn unsync_scope(&self, scope: Scope) -> SyncResult<()> {
        let _guard = self.locks.acquire(scope).await;
        match self.transport.bulk_overwrite(scope, &[]).await {
            Ok(remaining) => {
                self.cache.overwrite_scope(scope, remaining);
                info!(%scope, "wiped remote commands");
                Ok(())
            }
            Err(err) => {
                self.cache.invalidate_scope(Some(scope));
                Err(err.into())
            }
        }
    }

    /// Upserts each definition into `scope`, one call per definition.
    ///
    /// Nothing is deleted. Every definition is attempted and each success is
    /// cached as soon as it returns, so a refused definition never blocks
    /// the ones after it.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::DefinitionOutOfScope`] before any call when a
    /// definition does not target `scope`, or [`SyncError::UpsertsRejected`]
    /// carrying both the applied entries and the refused definitions when
    /// any upsert fails.
    pub async fn upsert_into_scope(
        &self,
        scope: Scope,
        definitions: &[CommandDefinition],
    ) -> SyncResult<Vec<RemoteCommandEntry>> {
        ensure_targets(scope, definitions)?;
        let _guard = self.locks.acquire(scope).await;
        let mut applied = Vec::with_capacity(definitions.len());
        let mut rejected = Vec::new();
        for definition in definitions {
            match self.transport.upsert_one(definition, scope).await {
                Ok(entry) => {
                    self.cache.put([entry.clone()]);
                    applied.push(entry);
                }
                Err(source) => {
                    warn!(%scope, command = definition.name(), error = %source, "upsert refused");
                    rejected.push(RejectedUpsert::new(definition.name().to_owned(), source));
                }
            }
        }
        info!(
            %scope,
            count = applied.len(),
            refused = rejected.len(),
            "upserted remote commands"
        );
        if rejected.is_empty() {
            Ok(applied)
        } else {
            Err(SyncError::UpsertsRejected { applied, rejected })
        }
    }

    /// Removes exactly the commands matching `commands` from `scope`,
    /// keeping every other registered command.
    ///
    /// The current contents are read per the configured removal staleness,
    /// then the scope is overwritten with what remains. Returns the entries
    /// left in the scope.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Transport`] when the fetch or the overwrite
    /// fails.
    pub async fn remove_from_scope<C>(
        &self,
        scope: Scope,
        commands: &[C],
    ) -> SyncResult<Vec<RemoteCommandEntry>>
    where
        C: CommandIdentity + Sync,
    {
        let _guard = self.locks.acquire(scope).await;
        let current = match self.config.removal_staleness {
            Staleness::CacheOnly => self.cache.all_in_scope(scope),
            Staleness::FillOnMiss => {
                let cached = self.cache.all_in_scope(scope);
                if cached.is_empty() {
                    self.fetch_scope_locked(scope).await?
                } else {
                    cached
                }
            }
            Staleness::AlwaysRefresh => self.fetch_scope_locked(scope).await?,
        };

        let remaining: Vec<CommandDefinition> = current
            .iter()
            .filter(|entry| find_same(*entry, commands).is_none())
            .map(RemoteCommandEntry::to_definition)
            .collect();
        debug!(
            %scope,
            removed = current.len() - remaining.len(),
            kept = remaining.len(),
            "computed surgical removal"
        );
        self.overwrite_locked(scope, &remaining).await
    }

    /// Deletes a single remote command and drops it from the cache.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Transport`] when the delete fails.
    pub async fn delete_entry(&self, command_id: RemoteCommandId, scope: Scope) -> SyncResult<()> {
        let _guard = self.locks.acquire(scope).await;
        self.transport.delete_one(command_id, scope).await?;
        let evicted = self.cache.remove(command_id).is_some();
        info!(%scope, %command_id, evicted, "deleted remote command");
        Ok(())
    }
}

fn ensure_targets(scope: Scope, definitions: &[CommandDefinition]) -> SyncResult<()> {
    definitions
        .iter()
        .find(|definition| !definition.targets(scope))
        .map_or(Ok(()), |stray| {
            Err(SyncError::DefinitionOutOfScope {
                name: stray.name().to_owned(),
                scope,
            })
        })
}
