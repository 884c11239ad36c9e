//! Shared fixtures for in-memory reconciliation integration tests.

use std::sync::Arc;

use cmdsync::command_registry::{
    adapters::memory::{InMemoryCommandTransport, StaticScopeDirectory},
    domain::{CommandDefinition, GroupId, RemoteCommandEntry, Scope},
    services::{BatchSyncService, ReconciliationService, SyncConfig},
};
use mockable::DefaultClock;
use rstest::fixture;
use serde_json::json;
use tracing_subscriber::EnvFilter;

/// Reconciliation engine wired to the in-memory adapters.
pub type TestEngine = ReconciliationService<InMemoryCommandTransport, StaticScopeDirectory>;

/// Batch service wired to the in-memory adapters.
pub type TestBatch = BatchSyncService<InMemoryCommandTransport, StaticScopeDirectory, DefaultClock>;

/// The adapters and services of one test.
pub struct Harness {
    /// Simulated remote registry.
    pub transport: Arc<InMemoryCommandTransport>,
    /// Groups the application operates in.
    pub directory: Arc<StaticScopeDirectory>,
    /// Batch service; its engine is reachable through [`Harness::engine`].
    pub batch: TestBatch,
}

impl Harness {
    /// Builds a harness over `transport` for the given operated groups.
    pub fn new(
        transport: InMemoryCommandTransport,
        groups: impl IntoIterator<Item = u64>,
        config: SyncConfig,
    ) -> Self {
        install_tracing();
        let shared_transport = Arc::new(transport);
        let directory = Arc::new(StaticScopeDirectory::new(
            groups.into_iter().map(GroupId::new),
        ));
        let engine = Arc::new(ReconciliationService::new(
            Arc::clone(&shared_transport),
            Arc::clone(&directory),
            config,
        ));
        Self {
            transport: shared_transport,
            directory,
            batch: BatchSyncService::new(engine, Arc::new(DefaultClock)),
        }
    }

    /// Returns the shared reconciliation engine.
    pub fn engine(&self) -> &TestEngine {
        self.batch.engine()
    }

    /// Returns the command names registered remotely in `scope`, sorted.
    ///
    /// # Panics
    ///
    /// Panics if the in-memory state cannot be read.
    pub fn remote_names(&self, scope: Scope) -> Vec<String> {
        let mut names: Vec<String> = self
            .transport
            .registered(scope)
            .expect("remote state should be readable")
            .iter()
            .map(|entry| entry.name().to_owned())
            .collect();
        names.sort_unstable();
        names
    }

    /// Returns the command names cached for `scope`, sorted.
    pub fn cached_names(&self, scope: Scope) -> Vec<String> {
        let mut names: Vec<String> = self
            .engine()
            .all_cached(scope)
            .iter()
            .map(|entry| entry.name().to_owned())
            .collect();
        names.sort_unstable();
        names
    }

    /// Seeds `scope` with chat-input commands named `names`.
    ///
    /// # Panics
    ///
    /// Panics if seeding fails.
    pub fn seed(&self, scope: Scope, names: &[&str]) -> Vec<RemoteCommandEntry> {
        let definitions: Vec<CommandDefinition> = names.iter().map(|name| chat(name)).collect();
        self.transport
            .seed(scope, &definitions)
            .expect("seeding should succeed")
    }
}

/// Provides a harness operating in groups 7 and 42 with default settings.
#[fixture]
pub fn harness() -> Harness {
    Harness::new(InMemoryCommandTransport::new(), [7, 42], SyncConfig::default())
}

/// Builds a global chat-input definition.
///
/// # Panics
///
/// Panics if `name` is blank.
pub fn chat(name: &str) -> CommandDefinition {
    CommandDefinition::chat_input(name, json!({ "name": name, "description": name }))
        .expect("test command names are valid")
}

/// Builds a chat-input definition for the given groups.
pub fn grouped(name: &str, groups: &[u64]) -> CommandDefinition {
    chat(name).with_scopes(groups.iter().copied().map(Scope::group))
}

/// Routes engine logs to the test output, honouring `RUST_LOG`.
pub fn install_tracing() {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    if installed.is_err() {
        tracing::trace!("tracing subscriber already installed");
    }
}
