//! Capability domain model.
//!
//! # Responsibility
//! - Define the capability record, its composite key and scope predicate.
//! - Define the caller context evaluated against a scope.
//!
//! # Invariants
//! - Every capability is addressed by exactly one `CapabilityKey`.
//! - Model types carry no registry state.

pub mod capability;
pub mod context;
