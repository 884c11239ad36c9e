//! Domain model for command registration and reconciliation.
//!
//! The domain models scopes, command types, locally declared definitions,
//! remotely registered entries and the identity rule that associates the two.
//! Transport and caching concerns remain outside this boundary.

mod definition;
mod entry;
mod error;
mod identity;
mod ids;
mod kind;
mod local_set;
mod policy;
mod scope;

pub use definition::CommandDefinition;
pub use entry::RemoteCommandEntry;
pub use error::{CommandRegistryDomainError, ParseCommandTypeError};
pub use identity::{CommandIdentity, CommandKey, find_all_same, find_same, same_command};
pub use ids::{RemoteCommandId, SyncRunId};
pub use kind::CommandType;
pub use local_set::LocalCommandSet;
pub use policy::{BatchMode, ErrorPolicy, Staleness, StrategyKind, SyncStrategy};
pub use scope::{GroupId, Scope};
