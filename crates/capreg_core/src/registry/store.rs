//! In-process capability registry.
//!
//! # Responsibility
//! - Own every registered capability for the lifetime of the process.
//! - Answer lookups and scoped enablement checks by exact composite key.
//!
//! # Invariants
//! - `(domain, name, version)` is unique; duplicates are rejected, never
//!   overwritten.
//! - A failed `register` leaves the registry unchanged.
//! - Unknown capabilities read as `None` / denied, never as errors.

use crate::model::capability::{Capability, CapabilityKey, CapabilityValidationError};
use crate::model::context::EvaluationContext;
use crate::registry::policy::{evaluate_capability, Decision, DenyReason, MissingContextPolicy};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Registration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    InvalidCapability(CapabilityValidationError),
    /// The `(domain, name, version)` triple is already registered.
    DuplicateCapability(CapabilityKey),
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidCapability(err) => write!(f, "invalid capability: {err}"),
            Self::DuplicateCapability(key) => {
                write!(f, "capability already registered: {key}")
            }
        }
    }
}

impl Error for RegistryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidCapability(err) => Some(err),
            Self::DuplicateCapability(_) => None,
        }
    }
}

impl From<CapabilityValidationError> for RegistryError {
    fn from(value: CapabilityValidationError) -> Self {
        Self::InvalidCapability(value)
    }
}

/// Authority deciding which capabilities exist and who may use them.
///
/// Writes take `&mut self` and reads take `&self`, so a registry seeded at
/// startup and then shared by reference is read-only for every consumer.
/// Use [`crate::SharedCapabilityRegistry`] when registration must continue
/// after startup.
#[derive(Debug, Default)]
pub struct CapabilityRegistry {
    entries: HashMap<CapabilityKey, Capability>,
    missing_context: MissingContextPolicy,
}

impl CapabilityRegistry {
    /// Creates an empty registry with [`MissingContextPolicy::PassThrough`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty registry with an explicit missing-context policy.
    pub fn with_policy(missing_context: MissingContextPolicy) -> Self {
        Self {
            entries: HashMap::new(),
            missing_context,
        }
    }

    pub fn policy(&self) -> MissingContextPolicy {
        self.missing_context
    }

    /// Registers one capability after validation.
    ///
    /// # Errors
    /// - [`RegistryError::InvalidCapability`] for a malformed record.
    /// - [`RegistryError::DuplicateCapability`] when the key already exists.
    pub fn register(&mut self, capability: Capability) -> RegistryResult<()> {
        capability.validate()?;
        let key = capability.key();
        if self.entries.contains_key(&key) {
            warn!(
                "event=capability_register module=registry status=error error_code=duplicate_capability key={key}"
            );
            return Err(RegistryError::DuplicateCapability(key));
        }

        info!(
            "event=capability_register module=registry status=ok key={} capability_status={} global={} created_by={}",
            key,
            capability.status.as_str(),
            capability.scope.global,
            capability.created_by
        );
        self.entries.insert(key, capability);
        Ok(())
    }

    /// Returns one capability by `(domain, name, version)`.
    pub fn get(&self, domain: &str, name: &str, version: u32) -> Option<&Capability> {
        self.entries.get(&CapabilityKey::new(domain, name, version))
    }

    pub fn get_by_key(&self, key: &CapabilityKey) -> Option<&Capability> {
        self.entries.get(key)
    }

    /// Returns the highest registered version of `(domain, name)`.
    pub fn get_latest(&self, domain: &str, name: &str) -> Option<&Capability> {
        self.entries
            .values()
            .filter(|capability| capability.domain == domain && capability.name == name)
            .max_by_key(|capability| capability.version)
    }

    pub fn contains(&self, key: &CapabilityKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Evaluates one capability check and reports why it was denied.
    pub fn evaluate(
        &self,
        domain: &str,
        name: &str,
        context: &EvaluationContext,
        version: u32,
    ) -> Decision {
        let key = CapabilityKey::new(domain, name, version);
        let decision = match self.entries.get(&key) {
            Some(capability) => evaluate_capability(capability, context, self.missing_context),
            None => Decision::Denied(DenyReason::NotRegistered),
        };
        debug!(
            "event=capability_check module=registry key={key} decision={}",
            decision_code(decision)
        );
        decision
    }

    /// Returns whether the capability may run for `context`.
    ///
    /// `false` covers both "not registered" and "registered but denied".
    pub fn is_enabled(
        &self,
        domain: &str,
        name: &str,
        context: &EvaluationContext,
        version: u32,
    ) -> bool {
        self.evaluate(domain, name, context, version).is_allowed()
    }

    /// Returns every registered capability in unspecified order.
    pub fn list(&self) -> Vec<&Capability> {
        self.entries.values().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn decision_code(decision: Decision) -> &'static str {
    match decision.deny_reason() {
        None => "allowed",
        Some(reason) => reason.as_str(),
    }
}
