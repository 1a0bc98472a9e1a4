//! Thread-safe registry handle for runtime registration.
//!
//! Cloning the handle shares one registry. Reads take the read lock;
//! `register` takes the write lock, so readers never observe a partially
//! inserted record.

use crate::model::capability::Capability;
use crate::model::context::EvaluationContext;
use crate::registry::policy::Decision;
use crate::registry::store::{CapabilityRegistry, RegistryResult};
use parking_lot::RwLock;
use std::sync::Arc;

/// Shared handle over one [`CapabilityRegistry`].
#[derive(Debug, Clone, Default)]
pub struct SharedCapabilityRegistry {
    inner: Arc<RwLock<CapabilityRegistry>>,
}

impl SharedCapabilityRegistry {
    pub fn new(registry: CapabilityRegistry) -> Self {
        Self {
            inner: Arc::new(RwLock::new(registry)),
        }
    }

    pub fn register(&self, capability: Capability) -> RegistryResult<()> {
        self.inner.write().register(capability)
    }

    /// Returns an owned copy of one capability.
    pub fn get(&self, domain: &str, name: &str, version: u32) -> Option<Capability> {
        self.inner.read().get(domain, name, version).cloned()
    }

    pub fn evaluate(
        &self,
        domain: &str,
        name: &str,
        context: &EvaluationContext,
        version: u32,
    ) -> Decision {
        self.inner.read().evaluate(domain, name, context, version)
    }

    pub fn is_enabled(
        &self,
        domain: &str,
        name: &str,
        context: &EvaluationContext,
        version: u32,
    ) -> bool {
        self.inner.read().is_enabled(domain, name, context, version)
    }

    /// Returns owned copies of every registered capability.
    pub fn list(&self) -> Vec<Capability> {
        self.inner.read().list().into_iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Runs `f` against the registry under one read lock.
    pub fn read<R>(&self, f: impl FnOnce(&CapabilityRegistry) -> R) -> R {
        f(&self.inner.read())
    }
}

impl From<CapabilityRegistry> for SharedCapabilityRegistry {
    fn from(value: CapabilityRegistry) -> Self {
        Self::new(value)
    }
}
