//! In-memory adapters for the remote registry and the scope directory.

mod directory;
mod transport;

pub use directory::StaticScopeDirectory;
pub use transport::{InMemoryCommandTransport, TransportCall};
