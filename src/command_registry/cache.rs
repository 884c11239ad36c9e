//! Dual-indexed in-memory mirror of the remote command registry.
//!
//! The cache keeps two views over one set of [`RemoteCommandEntry`] values:
//! a flat map keyed by remote identifier, and a structured index keyed by
//! command type, scope and name. The structured index stores identifiers
//! only, so every entry is owned exactly once. Every mutation updates both
//! views under a single write lock, which keeps them consistent for any
//! reader. The cache is a hint: entries leave it only through an explicit
//! removal or scope invalidation, never by expiry.

use crate::command_registry::domain::{CommandType, RemoteCommandEntry, RemoteCommandId, Scope};
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};

type NameIndex = HashMap<String, RemoteCommandId>;
type ScopeIndex = HashMap<Scope, NameIndex>;

/// In-memory registry cache shared by the reconciliation services.
#[derive(Debug, Default)]
pub struct RegistryCache {
    state: RwLock<CacheState>,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<RemoteCommandId, RemoteCommandEntry>,
    index: HashMap<CommandType, ScopeIndex>,
}

impl CacheState {
    fn insert(&mut self, entry: RemoteCommandEntry) {
        // The same id may come back renamed or moved.
        self.unlink(entry.id());

        let names = self
            .index
            .entry(entry.kind())
            .or_default()
            .entry(entry.scope())
            .or_default();
        if let Some(evicted) = names.insert(entry.name().to_owned(), entry.id())
            && evicted != entry.id()
        {
            self.entries.remove(&evicted);
        }
        self.entries.insert(entry.id(), entry);
    }

    fn unlink(&mut self, id: RemoteCommandId) -> Option<RemoteCommandEntry> {
        let entry = self.entries.remove(&id)?;
        if let Some(scopes) = self.index.get_mut(&entry.kind())
            && let Some(names) = scopes.get_mut(&entry.scope())
        {
            if names.get(entry.name()) == Some(&id) {
                names.remove(entry.name());
            }
            if names.is_empty() {
                scopes.remove(&entry.scope());
            }
        }
        Some(entry)
    }

    fn clear_scope(&mut self, scope: Scope) {
        self.entries.retain(|_, entry| entry.scope() != scope);
        for scopes in self.index.values_mut() {
            scopes.remove(&scope);
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    fn lookup(&self, kind: CommandType, scope: Scope, name: &str) -> Option<&RemoteCommandEntry> {
        let id = self.index.get(&kind)?.get(&scope)?.get(name)?;
        self.entries.get(id)
    }

    fn is_consistent(&self) -> bool {
        let indexed: usize = self
            .index
            .values()
            .flat_map(HashMap::values)
            .map(HashMap::len)
            .sum();
        indexed == self.entries.len()
            && self.entries.values().all(|entry| {
                self.lookup(entry.kind(), entry.scope(), entry.name())
                    .is_some_and(|found| found.id() == entry.id())
            })
    }
}

fn sorted(mut entries: Vec<RemoteCommandEntry>) -> Vec<RemoteCommandEntry> {
    entries.sort_by(|left, right| {
        (left.scope(), left.kind(), left.name()).cmp(&(right.scope(), right.kind(), right.name()))
    });
    entries
}

impl RegistryCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces entries.
    ///
    /// An entry displaces any other entry holding the same type, scope and
    /// name, as the remote registry allows only one.
    pub fn put(&self, entries: impl IntoIterator<Item = RemoteCommandEntry>) {
        let mut state = self.state.write();
        for entry in entries {
            state.insert(entry);
        }
    }

    /// Drops every entry in `scope`, or everything when `scope` is `None`.
    pub fn invalidate_scope(&self, scope: Option<Scope>) {
        let mut state = self.state.write();
        match scope {
            Some(target) => state.clear_scope(target),
            None => state.clear(),
        }
    }

    /// Replaces the contents of `scope` with `entries` in one step.
    ///
    /// Entries that belong to another scope are ignored.
    pub fn overwrite_scope(
        &self,
        scope: Scope,
        entries: impl IntoIterator<Item = RemoteCommandEntry>,
    ) {
        let mut state = self.state.write();
        state.clear_scope(scope);
        for entry in entries {
            if entry.scope() == scope {
                state.insert(entry);
            }
        }
    }

    /// Removes a single entry and returns it when present.
    #[must_use]
    pub fn remove(&self, id: RemoteCommandId) -> Option<RemoteCommandEntry> {
        self.state.write().unlink(id)
    }

    /// Returns the entry with the given remote identifier.
    #[must_use]
    pub fn get(&self, id: RemoteCommandId) -> Option<RemoteCommandEntry> {
        self.state.read().entries.get(&id).cloned()
    }

    /// Returns the entry registered under `name` for a type and scope.
    #[must_use]
    pub fn lookup(
        &self,
        kind: CommandType,
        scope: Scope,
        name: &str,
    ) -> Option<RemoteCommandEntry> {
        self.state.read().lookup(kind, scope, name).cloned()
    }

    /// Returns every entry in `scope`, ordered by type and name.
    #[must_use]
    pub fn all_in_scope(&self, scope: Scope) -> Vec<RemoteCommandEntry> {
        let state = self.state.read();
        let entries = state
            .index
            .values()
            .filter_map(|scopes| scopes.get(&scope))
            .flat_map(HashMap::values)
            .filter_map(|id| state.entries.get(id))
            .cloned()
            .collect();
        sorted(entries)
    }

    /// Returns every cached entry, ordered by scope, type and name.
    #[must_use]
    pub fn all(&self) -> Vec<RemoteCommandEntry> {
        sorted(self.state.read().entries.values().cloned().collect())
    }

    /// Returns every scope holding at least one entry.
    #[must_use]
    pub fn populated_scopes(&self) -> BTreeSet<Scope> {
        self.state
            .read()
            .entries
            .values()
            .map(RemoteCommandEntry::scope)
            .collect()
    }

    /// Returns the number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    /// Returns `true` when nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }

    /// Returns `true` when the flat and structured views describe the same
    /// entries.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.state.read().is_consistent()
    }
}
