//! Capability registry core.
//! This crate is the single authority on which platform features may run.

pub mod bootstrap;
pub mod config;
pub mod logging;
pub mod model;
pub mod registry;

pub use bootstrap::{
    bootstrap_capabilities, bootstrap_with_seeds, builtin_capabilities, seed_missing,
    COMMERCE_DOMAIN, PAYMENTS_DOMAIN,
};
pub use config::{ConfigError, ConfigResult, CoreConfig, SeedCapability};
pub use logging::{
    default_log_level, init_logging, init_logging_from_config, logging_status, LogTarget,
};
pub use model::capability::{
    now_epoch_ms, Capability, CapabilityId, CapabilityKey, CapabilityScope, CapabilityStatus,
    CapabilityValidationError, DEFAULT_VERSION, SYSTEM_ACTOR,
};
pub use model::context::EvaluationContext;
pub use registry::policy::{evaluate_capability, Decision, DenyReason, MissingContextPolicy};
pub use registry::shared::SharedCapabilityRegistry;
pub use registry::store::{CapabilityRegistry, RegistryError, RegistryResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
