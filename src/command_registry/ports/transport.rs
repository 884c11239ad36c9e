//! Transport port for the remote command registry API.

use crate::command_registry::domain::{
    CommandDefinition, RemoteCommandEntry, RemoteCommandId, Scope,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Result type for remote registry calls.
pub type TransportResult<T> = Result<T, TransportError>;

/// Capability contract for the remote command registry.
///
/// Implementations own authentication, rate limiting, retries and timeouts.
/// The reconciliation services call each method at most once per unit of
/// work and never retry.
#[async_trait]
pub trait CommandTransport: Send + Sync {
    /// Fetches every command registered in `scope`.
    async fn fetch_scope_commands(&self, scope: Scope) -> TransportResult<Vec<RemoteCommandEntry>>;

    /// Fetches a single command by identifier, or `None` when `scope` does
    /// not hold it.
    async fn fetch_command(
        &self,
        command_id: RemoteCommandId,
        scope: Scope,
    ) -> TransportResult<Option<RemoteCommandEntry>>;

    /// Replaces the whole contents of `scope` with `definitions`.
    ///
    /// Commands registered in `scope` but absent from `definitions` are
    /// deleted by the remote service.
    async fn bulk_overwrite(
        &self,
        scope: Scope,
        definitions: &[CommandDefinition],
    ) -> TransportResult<Vec<RemoteCommandEntry>>;

    /// Creates or updates one command in `scope`, leaving others untouched.
    async fn upsert_one(
        &self,
        definition: &CommandDefinition,
        scope: Scope,
    ) -> TransportResult<RemoteCommandEntry>;

    /// Deletes one command from `scope`.
    async fn delete_one(&self, command_id: RemoteCommandId, scope: Scope) -> TransportResult<()>;
}

/// Errors returned by transport adapters.
///
/// The reconciliation services only distinguish success from failure; the
/// variants exist for operators and for transport-side retry decisions.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The remote service throttled the request.
    #[error("rate limited by the remote registry")]
    RateLimited {
        /// Delay suggested by the remote service, when provided.
        retry_after: Option<Duration>,
    },

    /// Credentials were missing or rejected.
    #[error("remote registry rejected the credentials")]
    Unauthorized,

    /// The referenced command does not exist in the scope.
    #[error("remote command {command_id} not found in {scope}")]
    UnknownCommand {
        /// Identifier that was not found.
        command_id: RemoteCommandId,
        /// Scope that was searched.
        scope: Scope,
    },

    /// The remote service refused the payload.
    #[error("remote registry rejected the request: {0}")]
    Rejected(String),

    /// Network or protocol failure.
    #[error("transport failure: {0}")]
    Network(Arc<dyn std::error::Error + Send + Sync>),
}

impl TransportError {
    /// Wraps a network or protocol failure.
    #[must_use]
    pub fn network(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Network(Arc::new(err))
    }

    /// Returns `true` when repeating the call later may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Network(_))
    }
}
