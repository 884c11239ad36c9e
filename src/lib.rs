//! Cmdsync: command registry reconciliation.
//!
//! This crate keeps a remote command registry, partitioned into a global
//! scope and per-group scopes, in step with the commands an application
//! declares locally. It caches what the remote side holds, resolves local
//! definitions to server-assigned identifiers and reconciles scopes with a
//! choice of overwrite, upsert, wipe or surgical removal.
//!
//! # Architecture
//!
//! Cmdsync follows hexagonal architecture principles:
//!
//! - **Domain**: Pure command model with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for the remote registry and the
//!   group directory
//! - **Adapters**: Concrete implementations of ports (in-memory registry)
//!
//! # Modules
//!
//! - [`command_registry`]: Command model, cache and reconciliation services

pub mod command_registry;
