//! Command registry reconciliation for `cmdsync`.
//!
//! This module keeps a remote, scope-partitioned command registry consistent
//! with the commands an application declares locally. The remote service only
//! offers fetch, bulk overwrite, single upsert and single delete, so the
//! services here compute the difference and choose a strategy per scope. The
//! module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - The dual-indexed remote mirror in [`cache`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Reconciliation and batch orchestration services in [`services`]

pub mod adapters;
pub mod cache;
pub mod domain;
pub mod ports;
pub mod services;
