//! Application services for command reconciliation.
//!
//! [`ReconciliationService`] owns the cache and the declared command set and
//! reconciles one scope at a time. [`BatchSyncService`] fans those
//! operations out across scopes and aggregates the outcome.

mod batch;
mod config;
mod error;
mod locks;
mod reconciler;
mod report;

pub use batch::{BatchResult, BatchSyncService};
pub use config::SyncConfig;
pub use error::{RejectedUpsert, ScopeReconciliationError, SyncError, SyncResult};
pub use reconciler::ReconciliationService;
pub use report::{BatchAborted, ScopeStatus, ScopeSuccess, SyncReport};
