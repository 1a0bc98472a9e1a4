//! Capability domain model.
//!
//! # Responsibility
//! - Define the canonical capability record held by the registry.
//! - Derive the composite lookup key from `(domain, name, version)`.
//! - Provide declaration-level validation before registration.
//!
//! # Invariants
//! - `id` is generated once and never reused for another capability.
//! - One `(domain, name, version)` triple renders to exactly one key string.
//! - Records are never mutated after registration.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Opaque, globally unique capability identifier.
pub type CapabilityId = Uuid;

/// Version assumed by lookups that do not name one explicitly.
pub const DEFAULT_VERSION: u32 = 1;

/// Actor recorded for capabilities seeded at process start.
pub const SYSTEM_ACTOR: &str = "system";

// Domain and name segments must not contain `:` so rendered keys stay unambiguous.
static KEY_SEGMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("valid key segment regex"));

/// Master on/off switch, independent of scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityStatus {
    Enabled,
    Disabled,
}

impl CapabilityStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Enabled => "enabled",
            Self::Disabled => "disabled",
        }
    }

    pub fn is_enabled(self) -> bool {
        matches!(self, Self::Enabled)
    }
}

/// Authorization predicate data attached to one capability.
///
/// `global = true` short-circuits every other field. Otherwise each present
/// list is an independent constraint and all of them must pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityScope {
    #[serde(default)]
    pub global: bool,
    /// Business/tenant ids allowed to use the capability.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_ids: Option<Vec<String>>,
    /// Country codes allowed to use the capability.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub countries: Option<Vec<String>>,
}

impl CapabilityScope {
    /// Scope that applies regardless of caller context.
    pub fn global() -> Self {
        Self {
            global: true,
            business_ids: None,
            countries: None,
        }
    }

    /// Scope restricted to the given business ids.
    pub fn for_businesses<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::default().with_business_ids(ids)
    }

    /// Scope restricted to the given country codes.
    pub fn for_countries<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::default().with_countries(codes)
    }

    pub fn with_business_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.business_ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_countries<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.countries = Some(codes.into_iter().map(Into::into).collect());
        self
    }

    /// Returns whether no constraint is declared at all.
    ///
    /// An unconstrained non-global scope still allows every context.
    pub fn is_unconstrained(&self) -> bool {
        !self.global && self.business_ids.is_none() && self.countries.is_none()
    }

    fn validate(&self) -> Result<(), CapabilityValidationError> {
        if let Some(ids) = &self.business_ids {
            if ids.iter().any(|value| value.trim().is_empty()) {
                return Err(CapabilityValidationError::EmptyScopeEntry("business_ids"));
            }
        }
        if let Some(codes) = &self.countries {
            if codes.iter().any(|value| value.trim().is_empty()) {
                return Err(CapabilityValidationError::EmptyScopeEntry("countries"));
            }
        }
        Ok(())
    }
}

/// Composite registry key, rendered as `<domain>:<name>:v<version>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CapabilityKey {
    pub domain: String,
    pub name: String,
    pub version: u32,
}

impl CapabilityKey {
    pub fn new(domain: impl Into<String>, name: impl Into<String>, version: u32) -> Self {
        Self {
            domain: domain.into(),
            name: name.into(),
            version,
        }
    }

    fn validate(&self) -> Result<(), CapabilityValidationError> {
        if self.domain.trim().is_empty() {
            return Err(CapabilityValidationError::EmptyDomain);
        }
        if !KEY_SEGMENT_RE.is_match(&self.domain) {
            return Err(CapabilityValidationError::InvalidDomain(
                self.domain.clone(),
            ));
        }
        if self.name.trim().is_empty() {
            return Err(CapabilityValidationError::EmptyName);
        }
        if !KEY_SEGMENT_RE.is_match(&self.name) {
            return Err(CapabilityValidationError::InvalidName(self.name.clone()));
        }
        if self.version == 0 {
            return Err(CapabilityValidationError::ZeroVersion);
        }
        Ok(())
    }
}

impl Display for CapabilityKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:v{}", self.domain, self.name, self.version)
    }
}

impl FromStr for CapabilityKey {
    type Err = CapabilityValidationError;

    /// Parses the rendered key form back into its parts.
    ///
    /// A missing `:v<version>` suffix selects [`DEFAULT_VERSION`].
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || CapabilityValidationError::InvalidKey(value.to_string());
        let parts: Vec<&str> = value.trim().split(':').collect();
        let (domain, name, version) = match parts.as_slice() {
            [domain, name] => (*domain, *name, DEFAULT_VERSION),
            [domain, name, version] => {
                let digits = version.strip_prefix('v').ok_or_else(invalid)?;
                let version = digits.parse::<u32>().map_err(|_| invalid())?;
                (*domain, *name, version)
            }
            _ => return Err(invalid()),
        };

        let key = Self::new(domain, name, version);
        key.validate()?;
        Ok(key)
    }
}

/// The unit of controllable platform functionality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    pub id: CapabilityId,
    /// Namespace grouping related capabilities, e.g. `commerce`.
    pub domain: String,
    /// Feature name within the domain, e.g. `checkout`.
    pub name: String,
    /// Positive version; several versions of one name may coexist.
    pub version: u32,
    pub status: CapabilityStatus,
    pub scope: CapabilityScope,
    /// Actor that registered the capability.
    pub created_by: String,
    /// Unix epoch milliseconds.
    pub created_at_ms: i64,
}

impl Capability {
    /// Creates an enabled, globally scoped capability owned by [`SYSTEM_ACTOR`].
    pub fn new(domain: impl Into<String>, name: impl Into<String>, version: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            domain: domain.into(),
            name: name.into(),
            version,
            status: CapabilityStatus::Enabled,
            scope: CapabilityScope::global(),
            created_by: SYSTEM_ACTOR.to_string(),
            created_at_ms: now_epoch_ms(),
        }
    }

    pub fn with_status(mut self, status: CapabilityStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_scope(mut self, scope: CapabilityScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_created_by(mut self, actor: impl Into<String>) -> Self {
        self.created_by = actor.into();
        self
    }

    pub fn with_created_at_ms(mut self, created_at_ms: i64) -> Self {
        self.created_at_ms = created_at_ms;
        self
    }

    /// Composite registry key for this record.
    pub fn key(&self) -> CapabilityKey {
        CapabilityKey::new(self.domain.as_str(), self.name.as_str(), self.version)
    }

    /// Validates declaration-level invariants.
    ///
    /// # Errors
    /// - Nil id, blank `created_by`, or blank scope list entries.
    /// - Domain/name that are empty or not `[a-z][a-z0-9_]*`.
    /// - Version `0`.
    pub fn validate(&self) -> Result<(), CapabilityValidationError> {
        if self.id.is_nil() {
            return Err(CapabilityValidationError::NilId);
        }
        self.key().validate()?;
        if self.created_by.trim().is_empty() {
            return Err(CapabilityValidationError::EmptyCreatedBy);
        }
        self.scope.validate()
    }
}

/// Current wall-clock time as Unix epoch milliseconds.
///
/// Returns `0` if the system clock reads earlier than the epoch.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Capability declaration validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilityValidationError {
    NilId,
    EmptyDomain,
    InvalidDomain(String),
    EmptyName,
    InvalidName(String),
    ZeroVersion,
    EmptyCreatedBy,
    EmptyScopeEntry(&'static str),
    InvalidKey(String),
}

impl Display for CapabilityValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId => write!(f, "capability id must not be nil"),
            Self::EmptyDomain => write!(f, "capability domain must not be empty"),
            Self::InvalidDomain(value) => write!(
                f,
                "capability domain is invalid: {value} (expected [a-z][a-z0-9_]*)"
            ),
            Self::EmptyName => write!(f, "capability name must not be empty"),
            Self::InvalidName(value) => write!(
                f,
                "capability name is invalid: {value} (expected [a-z][a-z0-9_]*)"
            ),
            Self::ZeroVersion => write!(f, "capability version must be >= 1"),
            Self::EmptyCreatedBy => write!(f, "capability created_by must not be empty"),
            Self::EmptyScopeEntry(field) => {
                write!(f, "capability scope `{field}` contains an empty entry")
            }
            Self::InvalidKey(value) => write!(
                f,
                "capability key is invalid: {value} (expected <domain>:<name>[:v<version>])"
            ),
        }
    }
}

impl Error for CapabilityValidationError {}
