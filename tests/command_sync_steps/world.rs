//! Shared world state for command synchronisation BDD scenarios.

use std::sync::Arc;

use cmdsync::command_registry::{
    adapters::memory::{InMemoryCommandTransport, StaticScopeDirectory},
    domain::{CommandDefinition, Scope},
    services::{BatchResult, BatchSyncService, ReconciliationService, SyncConfig},
};
use mockable::DefaultClock;
use rstest::fixture;

/// Batch service type used by the BDD world.
pub type TestBatchService =
    BatchSyncService<InMemoryCommandTransport, StaticScopeDirectory, DefaultClock>;

/// Scenario world for command synchronisation behaviour tests.
pub struct CommandSyncWorld {
    pub transport: Arc<InMemoryCommandTransport>,
    pub directory: Arc<StaticScopeDirectory>,
    pub config: SyncConfig,
    pub declared: Vec<CommandDefinition>,
    pub outcome: Option<BatchResult>,
}

impl CommandSyncWorld {
    /// Creates a world with an empty remote registry and no operated groups.
    #[must_use]
    pub fn new() -> Self {
        Self {
            transport: Arc::new(InMemoryCommandTransport::new()),
            directory: Arc::new(StaticScopeDirectory::default()),
            config: SyncConfig::default(),
            declared: Vec::new(),
            outcome: None,
        }
    }

    /// Builds a batch service over the world's adapters with the declared
    /// commands registered.
    ///
    /// # Errors
    ///
    /// Returns an error when the declared commands collide.
    pub fn batch_service(&self) -> Result<TestBatchService, eyre::Report> {
        let engine = ReconciliationService::new(
            Arc::clone(&self.transport),
            Arc::clone(&self.directory),
            self.config.clone(),
        );
        engine
            .register_local(self.declared.clone())
            .map_err(|err| eyre::eyre!("register declared commands: {err}"))?;
        Ok(BatchSyncService::new(
            Arc::new(engine),
            Arc::new(DefaultClock),
        ))
    }

    /// Returns the sorted names registered remotely in `scope`.
    ///
    /// # Errors
    ///
    /// Returns an error when the remote state cannot be read.
    pub fn remote_names(&self, scope: Scope) -> Result<Vec<String>, eyre::Report> {
        let mut names: Vec<String> = self
            .transport
            .registered(scope)
            .map_err(|err| eyre::eyre!("read remote state: {err}"))?
            .iter()
            .map(|entry| entry.name().to_owned())
            .collect();
        names.sort_unstable();
        Ok(names)
    }
}

impl Default for CommandSyncWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> CommandSyncWorld {
    CommandSyncWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
