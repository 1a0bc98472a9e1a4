//! Capability registry.
//!
//! This module owns the set of registered capabilities and decides whether a
//! caller context may use one. Registration happens during startup; checks
//! are synchronous, in-memory lookups by composite key.

pub mod policy;
pub mod shared;
pub mod store;
