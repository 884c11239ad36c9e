//! Port contracts for command registry reconciliation.

mod directory;
mod transport;

pub use directory::ScopeDirectory;
pub use transport::{CommandTransport, TransportError, TransportResult};
