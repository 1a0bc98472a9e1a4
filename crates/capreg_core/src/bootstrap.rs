//! Startup seeding of the platform's built-in capabilities.
//!
//! # Responsibility
//! - Build the baseline capability set deterministically.
//! - Register each built-in exactly once into an injected registry.
//!
//! # Invariants
//! - Built-ins are enabled, globally scoped and owned by `system`.
//! - `bootstrap_capabilities` is not transactional: a duplicate aborts the
//!   run and earlier registrations stay in place.
//! - `seed_missing` never fails on keys that are already registered.

use crate::model::capability::{now_epoch_ms, Capability, DEFAULT_VERSION};
use crate::registry::store::{CapabilityRegistry, RegistryResult};
use log::{error, info};

/// Domain for storefront flows.
pub const COMMERCE_DOMAIN: &str = "commerce";
/// Domain for payment flows.
pub const PAYMENTS_DOMAIN: &str = "payments";

const BUILTIN_CAPABILITIES: &[(&str, &str)] = &[
    (COMMERCE_DOMAIN, "product_listing"),
    (COMMERCE_DOMAIN, "add_to_cart"),
    (COMMERCE_DOMAIN, "checkout"),
    (PAYMENTS_DOMAIN, "payment_capture"),
];

/// Builds fresh records for the built-in set.
///
/// Every record gets a new id; all share one creation timestamp.
pub fn builtin_capabilities() -> Vec<Capability> {
    let created_at_ms = now_epoch_ms();
    BUILTIN_CAPABILITIES
        .iter()
        .map(|(domain, name)| {
            Capability::new(*domain, *name, DEFAULT_VERSION).with_created_at_ms(created_at_ms)
        })
        .collect()
}

/// Registers the built-in set into `registry`.
///
/// Intended to run once per process against a fresh registry.
///
/// # Errors
/// Propagates the first registration error; capabilities registered before
/// it remain in the registry.
pub fn bootstrap_capabilities(registry: &mut CapabilityRegistry) -> RegistryResult<()> {
    bootstrap_with_seeds(registry, Vec::new())
}

/// Registers the built-in set followed by `seeds`.
///
/// Same failure semantics as [`bootstrap_capabilities`].
pub fn bootstrap_with_seeds(
    registry: &mut CapabilityRegistry,
    seeds: Vec<Capability>,
) -> RegistryResult<()> {
    info!("event=bootstrap module=bootstrap status=start seeds={}", seeds.len());

    let mut registered = 0usize;
    for capability in builtin_capabilities().into_iter().chain(seeds) {
        if let Err(err) = registry.register(capability) {
            error!(
                "event=bootstrap module=bootstrap status=error registered={registered} error={err}"
            );
            return Err(err);
        }
        registered += 1;
    }

    info!("event=bootstrap module=bootstrap status=ok registered={registered}");
    Ok(())
}

/// Registers every capability whose key is not yet present.
///
/// Returns how many were newly registered. Safe to call repeatedly.
///
/// # Errors
/// Propagates validation errors for malformed records.
pub fn seed_missing(
    registry: &mut CapabilityRegistry,
    capabilities: impl IntoIterator<Item = Capability>,
) -> RegistryResult<usize> {
    let mut registered = 0usize;
    let mut skipped = 0usize;
    for capability in capabilities {
        if registry.contains(&capability.key()) {
            skipped += 1;
            continue;
        }
        registry.register(capability)?;
        registered += 1;
    }

    info!(
        "event=seed_missing module=bootstrap status=ok registered={registered} skipped={skipped}"
    );
    Ok(registered)
}

#[cfg(test)]
mod tests {
    use super::{bootstrap_capabilities, builtin_capabilities, seed_missing};
    use crate::model::capability::{Capability, CapabilityKey};
    use crate::registry::store::{CapabilityRegistry, RegistryError};

    #[test]
    fn builtins_have_distinct_ids_and_shared_timestamp() {
        let builtins = builtin_capabilities();
        assert_eq!(builtins.len(), 4);
        assert_ne!(builtins[0].id, builtins[1].id);
        assert!(builtins
            .iter()
            .all(|capability| capability.created_at_ms == builtins[0].created_at_ms));
    }

    #[test]
    fn second_bootstrap_fails_on_first_builtin() {
        let mut registry = CapabilityRegistry::new();
        bootstrap_capabilities(&mut registry).expect("first bootstrap should succeed");

        let err = bootstrap_capabilities(&mut registry).expect_err("second bootstrap must fail");
        assert_eq!(
            err,
            RegistryError::DuplicateCapability(CapabilityKey::new(
                "commerce",
                "product_listing",
                1
            ))
        );
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn seed_missing_skips_registered_keys() {
        let mut registry = CapabilityRegistry::new();
        bootstrap_capabilities(&mut registry).expect("bootstrap should succeed");

        let added = seed_missing(
            &mut registry,
            builtin_capabilities()
                .into_iter()
                .chain([Capability::new("commerce", "wishlist", 1)]),
        )
        .expect("seeding should succeed");
        assert_eq!(added, 1);
        assert_eq!(registry.len(), 5);

        let added = seed_missing(&mut registry, builtin_capabilities())
            .expect("re-seeding should succeed");
        assert_eq!(added, 0);
    }
}
