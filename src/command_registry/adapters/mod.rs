//! Adapter implementations for command registry ports.

pub mod memory;
