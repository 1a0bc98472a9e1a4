//! Scope evaluation for one capability against one caller context.
//!
//! # Invariants
//! - A disabled capability is denied before scope is consulted.
//! - `global = true` allows every context.
//! - Present scope constraints are AND-ed; absent ones are skipped.
//! - A context field missing for a present constraint is decided by
//!   [`MissingContextPolicy`].

use crate::model::capability::Capability;
use crate::model::context::EvaluationContext;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// What to do when a scope constraint is set but the context lacks the field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingContextPolicy {
    /// The constraint is not evaluated and does not deny on its own.
    #[default]
    PassThrough,
    /// The constraint is treated as unsatisfied.
    Deny,
}

impl MissingContextPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PassThrough => "pass_through",
            Self::Deny => "deny",
        }
    }

    /// Parses `pass_through|deny` (case-insensitive, `-` accepted for `_`).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "pass_through" => Some(Self::PassThrough),
            "deny" => Some(Self::Deny),
            _ => None,
        }
    }
}

/// Why an evaluation denied access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DenyReason {
    NotRegistered,
    Disabled,
    BusinessNotInScope,
    CountryNotInScope,
    MissingBusinessId,
    MissingCountry,
}

impl DenyReason {
    /// Stable snake_case code used in logs and CLI output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotRegistered => "not_registered",
            Self::Disabled => "disabled",
            Self::BusinessNotInScope => "business_not_in_scope",
            Self::CountryNotInScope => "country_not_in_scope",
            Self::MissingBusinessId => "missing_business_id",
            Self::MissingCountry => "missing_country",
        }
    }
}

impl Display for DenyReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one capability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied(DenyReason),
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Self::Allowed)
    }

    pub fn deny_reason(self) -> Option<DenyReason> {
        match self {
            Self::Allowed => None,
            Self::Denied(reason) => Some(reason),
        }
    }
}

impl Display for Decision {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Allowed => f.write_str("allowed"),
            Self::Denied(reason) => write!(f, "denied reason={reason}"),
        }
    }
}

/// Evaluates one registered capability against `context`.
pub fn evaluate_capability(
    capability: &Capability,
    context: &EvaluationContext,
    policy: MissingContextPolicy,
) -> Decision {
    if !capability.status.is_enabled() {
        return Decision::Denied(DenyReason::Disabled);
    }

    let scope = &capability.scope;
    if scope.global {
        return Decision::Allowed;
    }

    let business = check_constraint(
        scope.business_ids.as_deref(),
        context.business_id(),
        policy,
        DenyReason::BusinessNotInScope,
        DenyReason::MissingBusinessId,
    );
    let country = check_constraint(
        scope.countries.as_deref(),
        context.country(),
        policy,
        DenyReason::CountryNotInScope,
        DenyReason::MissingCountry,
    );

    match business.and(country) {
        Ok(()) => Decision::Allowed,
        Err(reason) => Decision::Denied(reason),
    }
}

fn check_constraint(
    allowed: Option<&[String]>,
    value: Option<&str>,
    policy: MissingContextPolicy,
    not_in_scope: DenyReason,
    missing: DenyReason,
) -> Result<(), DenyReason> {
    let Some(allowed) = allowed else {
        return Ok(());
    };

    match value {
        Some(value) if allowed.iter().any(|entry| entry == value) => Ok(()),
        Some(_) => Err(not_in_scope),
        None => match policy {
            MissingContextPolicy::PassThrough => Ok(()),
            MissingContextPolicy::Deny => Err(missing),
        },
    }
}
