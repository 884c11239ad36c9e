//! Per-scope mutual exclusion for reconciliation critical sections.

use crate::command_registry::domain::Scope;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Hands out one async lock per scope.
///
/// A guard is held across the network call and the cache update of a
/// strategy, so two writers to the same scope never interleave. Different
/// scopes never contend.
#[derive(Debug, Default)]
pub(crate) struct ScopeLocks {
    locks: Mutex<HashMap<Scope, Arc<AsyncMutex<()>>>>,
}

impl ScopeLocks {
    pub(crate) async fn acquire(&self, scope: Scope) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock();
            Arc::clone(locks.entry(scope).or_default())
        };
        lock.lock_owned().await
    }
}
