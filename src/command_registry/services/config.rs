//! Tunables for reconciliation and batch orchestration.

use crate::command_registry::domain::Staleness;
use serde::{Deserialize, Serialize};

/// Default number of scopes a batch reconciles at once.
const DEFAULT_MAX_CONCURRENT_SCOPES: usize = 4;

/// Configuration for the reconciliation services.
///
/// Missing fields take their default values when deserialised.
///
/// # Examples
///
/// ```
/// use cmdsync::command_registry::{domain::Staleness, services::SyncConfig};
///
/// let config = SyncConfig::default();
/// assert_eq!(config.concurrency(), 4);
/// assert_eq!(config.removal_staleness, Staleness::AlwaysRefresh);
///
/// let serial = SyncConfig::serial();
/// assert_eq!(serial.concurrency(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Maximum number of scopes reconciled concurrently by a batch.
    pub max_concurrent_scopes: usize,
    /// How the current remote contents of a scope are read before a
    /// surgical removal.
    pub removal_staleness: Staleness,
    /// Policy used by resolution calls that do not pass one explicitly.
    pub default_staleness: Staleness,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_concurrent_scopes: DEFAULT_MAX_CONCURRENT_SCOPES,
            removal_staleness: Staleness::AlwaysRefresh,
            default_staleness: Staleness::FillOnMiss,
        }
    }
}

impl SyncConfig {
    /// Creates a configuration that reconciles one scope at a time.
    ///
    /// Useful when the transport's rate-limit budget is tight.
    #[must_use]
    pub const fn serial() -> Self {
        Self {
            max_concurrent_scopes: 1,
            removal_staleness: Staleness::AlwaysRefresh,
            default_staleness: Staleness::FillOnMiss,
        }
    }

    /// Creates a configuration that trusts the cache wherever it can.
    ///
    /// Surgical removals fetch only scopes with no cached entries, and
    /// default resolutions never touch the network.
    #[must_use]
    pub const fn cache_first() -> Self {
        Self {
            max_concurrent_scopes: DEFAULT_MAX_CONCURRENT_SCOPES,
            removal_staleness: Staleness::FillOnMiss,
            default_staleness: Staleness::CacheOnly,
        }
    }

    /// Sets the batch concurrency limit.
    #[must_use]
    pub const fn with_max_concurrent_scopes(mut self, limit: usize) -> Self {
        self.max_concurrent_scopes = limit;
        self
    }

    /// Returns the effective concurrency limit, never less than one.
    #[must_use]
    pub const fn concurrency(&self) -> usize {
        if self.max_concurrent_scopes == 0 {
            1
        } else {
            self.max_concurrent_scopes
        }
    }
}
