//! In-memory simulation of the remote command registry.

use crate::command_registry::{
    domain::{CommandDefinition, CommandType, RemoteCommandEntry, RemoteCommandId, Scope},
    ports::{CommandTransport, TransportError, TransportResult},
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

/// First identifier handed out by the simulated registry.
const FIRST_REMOTE_ID: u64 = 1_000;

/// A call received by [`InMemoryCommandTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    /// `fetch_scope_commands`.
    FetchScope(Scope),
    /// `fetch_command`.
    FetchCommand {
        /// Requested identifier.
        command_id: RemoteCommandId,
        /// Scope searched.
        scope: Scope,
    },
    /// `bulk_overwrite`, with the names sent in order.
    BulkOverwrite {
        /// Scope overwritten.
        scope: Scope,
        /// Names of the definitions sent.
        names: Vec<String>,
    },
    /// `upsert_one`.
    Upsert {
        /// Scope written.
        scope: Scope,
        /// Name of the definition sent.
        name: String,
    },
    /// `delete_one`.
    Delete {
        /// Identifier deleted.
        command_id: RemoteCommandId,
        /// Scope written.
        scope: Scope,
    },
}

impl TransportCall {
    /// Returns the scope the call addressed.
    #[must_use]
    pub const fn scope(&self) -> Scope {
        match self {
            Self::FetchScope(scope)
            | Self::FetchCommand { scope, .. }
            | Self::BulkOverwrite { scope, .. }
            | Self::Upsert { scope, .. }
            | Self::Delete { scope, .. } => *scope,
        }
    }

    /// Returns `true` for calls that change remote state.
    #[must_use]
    pub const fn is_write(&self) -> bool {
        matches!(
            self,
            Self::BulkOverwrite { .. } | Self::Upsert { .. } | Self::Delete { .. }
        )
    }
}

/// In-memory remote registry adapter.
///
/// This adapter behaves like the remote service: it assigns identifiers,
/// keeps one command per name and type in each scope, and preserves the
/// identifier of a command that is overwritten or upserted in place. It also
/// records every call, can fail chosen scopes, and can add latency so tests
/// can observe how many calls run at once.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCommandTransport {
    state: Arc<RwLock<RemoteRegistryState>>,
    latency: Option<Duration>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
}

#[derive(Debug, Default)]
struct RemoteRegistryState {
    scopes: BTreeMap<Scope, Vec<RemoteCommandEntry>>,
    issued_ids: u64,
    failures: HashMap<Scope, TransportError>,
    refused_names: HashMap<String, TransportError>,
    calls: Vec<TransportCall>,
}

impl RemoteRegistryState {
    fn next_id(&mut self) -> RemoteCommandId {
        let id = RemoteCommandId::new(FIRST_REMOTE_ID + self.issued_ids);
        self.issued_ids += 1;
        id
    }

    fn existing_id(&self, scope: Scope, kind: CommandType, name: &str) -> Option<RemoteCommandId> {
        self.scopes.get(&scope).and_then(|entries| {
            entries
                .iter()
                .find(|entry| entry.kind() == kind && entry.name() == name)
                .map(RemoteCommandEntry::id)
        })
    }

    fn materialise(&mut self, scope: Scope, definition: &CommandDefinition) -> RemoteCommandEntry {
        let id = self
            .existing_id(scope, definition.kind(), definition.name())
            .unwrap_or_else(|| self.next_id());
        RemoteCommandEntry::new(
            id,
            definition.name(),
            definition.kind(),
            scope,
            definition.payload().clone(),
        )
    }

    fn overwrite(
        &mut self,
        scope: Scope,
        definitions: &[CommandDefinition],
    ) -> Vec<RemoteCommandEntry> {
        let mut replacement: Vec<RemoteCommandEntry> = Vec::with_capacity(definitions.len());
        for definition in definitions {
            let entry = self.materialise(scope, definition);
            replacement.retain(|kept| kept.kind() != entry.kind() || kept.name() != entry.name());
            replacement.push(entry);
        }
        self.scopes.insert(scope, replacement.clone());
        replacement
    }

    fn upsert(&mut self, scope: Scope, definition: &CommandDefinition) -> RemoteCommandEntry {
        let entry = self.materialise(scope, definition);
        let entries = self.scopes.entry(scope).or_default();
        entries.retain(|kept| kept.id() != entry.id());
        entries.push(entry.clone());
        entry
    }
}

/// Decrements the in-flight counter when a simulated call finishes.
struct InFlight {
    counter: Arc<AtomicUsize>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

impl InMemoryCommandTransport {
    /// Creates an empty remote registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every call by `latency`.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn read_state(&self) -> TransportResult<RwLockReadGuard<'_, RemoteRegistryState>> {
        self.state
            .read()
            .map_err(|err| TransportError::network(std::io::Error::other(err.to_string())))
    }

    fn write_state(&self) -> TransportResult<RwLockWriteGuard<'_, RemoteRegistryState>> {
        self.state
            .write()
            .map_err(|err| TransportError::network(std::io::Error::other(err.to_string())))
    }

    /// Registers commands directly, as if another client had created them.
    ///
    /// No call is recorded.
    ///
    /// # Errors
    ///
    /// Returns transport errors when lock acquisition fails.
    pub fn seed(
        &self,
        scope: Scope,
        definitions: &[CommandDefinition],
    ) -> TransportResult<Vec<RemoteCommandEntry>> {
        let mut state = self.write_state()?;
        Ok(definitions
            .iter()
            .map(|definition| state.upsert(scope, definition))
            .collect())
    }

    /// Makes every subsequent call addressing `scope` fail with `error`.
    ///
    /// # Errors
    ///
    /// Returns transport errors when lock acquisition fails.
    pub fn fail_scope(&self, scope: Scope, error: TransportError) -> TransportResult<()> {
        self.write_state()?.failures.insert(scope, error);
        Ok(())
    }

    /// Makes every subsequent upsert of a command named `name` fail with
    /// `error`, in any scope.
    ///
    /// # Errors
    ///
    /// Returns transport errors when lock acquisition fails.
    pub fn refuse_upserts_of(&self, name: &str, error: TransportError) -> TransportResult<()> {
        self.write_state()?.refused_names.insert(name.to_owned(), error);
        Ok(())
    }

    /// Lets calls addressing `scope` succeed again.
    ///
    /// # Errors
    ///
    /// Returns transport errors when lock acquisition fails.
    pub fn restore_scope(&self, scope: Scope) -> TransportResult<()> {
        self.write_state()?.failures.remove(&scope);
        Ok(())
    }

    /// Returns the commands currently registered in `scope` without
    /// recording a call.
    ///
    /// # Errors
    ///
    /// Returns transport errors when lock acquisition fails.
    pub fn registered(&self, scope: Scope) -> TransportResult<Vec<RemoteCommandEntry>> {
        Ok(self
            .read_state()?
            .scopes
            .get(&scope)
            .cloned()
            .unwrap_or_default())
    }

    /// Returns every call received so far, in arrival order.
    ///
    /// # Errors
    ///
    /// Returns transport errors when lock acquisition fails.
    pub fn calls(&self) -> TransportResult<Vec<TransportCall>> {
        Ok(self.read_state()?.calls.clone())
    }

    /// Forgets the recorded calls.
    ///
    /// # Errors
    ///
    /// Returns transport errors when lock acquisition fails.
    pub fn clear_calls(&self) -> TransportResult<()> {
        self.write_state()?.calls.clear();
        Ok(())
    }

    /// Returns the highest number of calls observed in flight at once.
    #[must_use]
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    async fn begin(&self, call: TransportCall) -> TransportResult<InFlight> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        let in_flight = InFlight {
            counter: Arc::clone(&self.in_flight),
        };

        {
            let mut state = self.write_state()?;
            let scope = call.scope();
            state.calls.push(call);
            if let Some(error) = state.failures.get(&scope) {
                return Err(error.clone());
            }
        }

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        Ok(in_flight)
    }
}

#[async_trait]
impl CommandTransport for InMemoryCommandTransport {
    async fn fetch_scope_commands(&self, scope: Scope) -> TransportResult<Vec<RemoteCommandEntry>> {
        let _in_flight = self.begin(TransportCall::FetchScope(scope)).await?;
        self.registered(scope)
    }

    async fn fetch_command(
        &self,
        command_id: RemoteCommandId,
        scope: Scope,
    ) -> TransportResult<Option<RemoteCommandEntry>> {
        let _in_flight = self
            .begin(TransportCall::FetchCommand { command_id, scope })
            .await?;
        let state = self.read_state()?;
        Ok(state.scopes.get(&scope).and_then(|entries| {
            entries
                .iter()
                .find(|entry| entry.id() == command_id)
                .cloned()
        }))
    }

    async fn bulk_overwrite(
        &self,
        scope: Scope,
        definitions: &[CommandDefinition],
    ) -> TransportResult<Vec<RemoteCommandEntry>> {
        let names = definitions
            .iter()
            .map(|definition| definition.name().to_owned())
            .collect();
        let _in_flight = self
            .begin(TransportCall::BulkOverwrite { scope, names })
            .await?;
        Ok(self.write_state()?.overwrite(scope, definitions))
    }

    async fn upsert_one(
        &self,
        definition: &CommandDefinition,
        scope: Scope,
    ) -> TransportResult<RemoteCommandEntry> {
        let _in_flight = self
            .begin(TransportCall::Upsert {
                scope,
                name: definition.name().to_owned(),
            })
            .await?;
        let mut state = self.write_state()?;
        if let Some(error) = state.refused_names.get(definition.name()) {
            return Err(error.clone());
        }
        Ok(state.upsert(scope, definition))
    }

    async fn delete_one(&self, command_id: RemoteCommandId, scope: Scope) -> TransportResult<()> {
        let _in_flight = self
            .begin(TransportCall::Delete { command_id, scope })
            .await?;
        let mut state = self.write_state()?;
        let entries = state.scopes.entry(scope).or_default();
        let before = entries.len();
        entries.retain(|entry| entry.id() != command_id);
        if entries.len() == before {
            return Err(TransportError::UnknownCommand { command_id, scope });
        }
        Ok(())
    }
}
