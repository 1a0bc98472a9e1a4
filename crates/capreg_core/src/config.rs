//! Core configuration.
//!
//! # Responsibility
//! - Load logging and evaluation settings from TOML.
//! - Apply `CAPREG_*` environment overrides on top of file values.
//! - Declare extra seed capabilities registered alongside the built-ins.
//!
//! # Invariants
//! - `CoreConfig::default()` is valid without any file.
//! - A config that passed `validate()` yields seeds that register cleanly
//!   unless they collide with each other or the built-in set.

use crate::logging::{default_log_level, normalize_level, normalize_log_dir};
use crate::model::capability::{
    Capability, CapabilityScope, CapabilityStatus, CapabilityValidationError, DEFAULT_VERSION,
    SYSTEM_ACTOR,
};
use crate::registry::policy::MissingContextPolicy;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Environment variable overriding `log_level`.
pub const ENV_LOG_LEVEL: &str = "CAPREG_LOG_LEVEL";
/// Environment variable overriding `log_dir`.
pub const ENV_LOG_DIR: &str = "CAPREG_LOG_DIR";
/// Environment variable overriding `missing_context`.
pub const ENV_MISSING_CONTEXT: &str = "CAPREG_MISSING_CONTEXT";

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Process-level configuration for the capability core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Absolute directory for rolling log files; stderr when unset.
    pub log_dir: Option<PathBuf>,
    pub missing_context: MissingContextPolicy,
    /// Extra capabilities seeded after the built-in set.
    #[serde(rename = "seed")]
    pub seeds: Vec<SeedCapability>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level().to_string(),
            log_dir: None,
            missing_context: MissingContextPolicy::default(),
            seeds: Vec::new(),
        }
    }
}

impl CoreConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(raw: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(raw).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Applies `CAPREG_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> ConfigResult<()> {
        self.apply_overrides_from(|name| std::env::var(name).ok())
    }

    /// Applies overrides from an arbitrary variable lookup.
    ///
    /// Blank values are ignored.
    pub fn apply_overrides_from(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> ConfigResult<()> {
        let value_of = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(level) = value_of(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        if let Some(dir) = value_of(ENV_LOG_DIR) {
            self.log_dir = Some(PathBuf::from(dir.trim()));
        }
        if let Some(raw) = value_of(ENV_MISSING_CONTEXT) {
            self.missing_context = MissingContextPolicy::parse(&raw)
                .ok_or(ConfigError::InvalidMissingContext(raw))?;
        }
        self.validate()
    }

    /// Validates level, directory and every seed declaration.
    pub fn validate(&self) -> ConfigResult<()> {
        normalize_level(&self.log_level).map_err(ConfigError::InvalidLogLevel)?;
        if let Some(dir) = &self.log_dir {
            normalize_log_dir(&dir.to_string_lossy()).map_err(ConfigError::InvalidLogDir)?;
        }
        self.seed_capabilities().map(|_| ())
    }

    /// Builds capability records for every declared seed.
    pub fn seed_capabilities(&self) -> ConfigResult<Vec<Capability>> {
        self.seeds
            .iter()
            .enumerate()
            .map(|(index, seed)| {
                let capability = seed.to_capability();
                capability
                    .validate()
                    .map_err(|source| ConfigError::InvalidSeed { index, source })?;
                Ok(capability)
            })
            .collect()
    }
}

/// Declarative capability descriptor loaded from config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedCapability {
    pub domain: String,
    pub name: String,
    #[serde(default = "default_seed_version")]
    pub version: u32,
    #[serde(default = "default_seed_status")]
    pub status: CapabilityStatus,
    #[serde(default = "CapabilityScope::global")]
    pub scope: CapabilityScope,
    #[serde(default = "default_seed_actor")]
    pub created_by: String,
}

impl SeedCapability {
    /// Builds a fresh record with a new id and current timestamp.
    pub fn to_capability(&self) -> Capability {
        Capability::new(self.domain.as_str(), self.name.as_str(), self.version)
            .with_status(self.status)
            .with_scope(self.scope.clone())
            .with_created_by(self.created_by.as_str())
    }
}

fn default_seed_version() -> u32 {
    DEFAULT_VERSION
}

fn default_seed_status() -> CapabilityStatus {
    CapabilityStatus::Enabled
}

fn default_seed_actor() -> String {
    SYSTEM_ACTOR.to_string()
}

/// Configuration loading errors.
#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(toml::de::Error),
    InvalidLogLevel(String),
    InvalidLogDir(String),
    InvalidMissingContext(String),
    InvalidSeed {
        index: usize,
        source: CapabilityValidationError,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "failed to parse config: {err}"),
            Self::InvalidLogLevel(message) => write!(f, "{message}"),
            Self::InvalidLogDir(message) => write!(f, "{message}"),
            Self::InvalidMissingContext(value) => write!(
                f,
                "unsupported missing_context `{value}`; expected pass_through|deny"
            ),
            Self::InvalidSeed { index, source } => {
                write!(f, "seed #{index} is invalid: {source}")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::InvalidSeed { source, .. } => Some(source),
            Self::InvalidLogLevel(_) | Self::InvalidLogDir(_) | Self::InvalidMissingContext(_) => {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig, ENV_LOG_LEVEL, ENV_MISSING_CONTEXT};
    use crate::model::capability::{CapabilityStatus, CapabilityValidationError};
    use crate::registry::policy::MissingContextPolicy;
    use std::collections::HashMap;

    #[test]
    fn default_config_is_valid() {
        let config = CoreConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.missing_context, MissingContextPolicy::PassThrough);
        assert!(config.seeds.is_empty());
    }

    #[test]
    fn parses_seed_defaults() {
        let config = CoreConfig::from_toml_str(
            r#"
            missing_context = "deny"

            [[seed]]
            domain = "commerce"
            name = "wishlist"
            "#,
        )
        .expect("config should parse");

        assert_eq!(config.missing_context, MissingContextPolicy::Deny);
        let seeds = config.seed_capabilities().expect("seeds should build");
        assert_eq!(seeds.len(), 1);
        assert_eq!(seeds[0].version, 1);
        assert_eq!(seeds[0].status, CapabilityStatus::Enabled);
        assert!(seeds[0].scope.global);
        assert_eq!(seeds[0].created_by, "system");
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = CoreConfig::from_toml_str("log_levle = \"info\"")
            .expect_err("typo field must be rejected");
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_invalid_seed_with_index() {
        let err = CoreConfig::from_toml_str(
            r#"
            [[seed]]
            domain = "commerce"
            name = "checkout"

            [[seed]]
            domain = "commerce"
            name = "checkout"
            version = 0
            "#,
        )
        .expect_err("zero version seed must be rejected");
        assert!(matches!(
            err,
            ConfigError::InvalidSeed {
                index: 1,
                source: CapabilityValidationError::ZeroVersion
            }
        ));
    }

    #[test]
    fn rejects_relative_log_dir() {
        let err = CoreConfig::from_toml_str("log_dir = \"logs/dev\"")
            .expect_err("relative log dir must be rejected");
        assert!(matches!(err, ConfigError::InvalidLogDir(_)));
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let vars = HashMap::from([
            (ENV_LOG_LEVEL, "warn".to_string()),
            (ENV_MISSING_CONTEXT, "Deny".to_string()),
        ]);
        let mut config = CoreConfig::default();
        config
            .apply_overrides_from(|name| vars.get(name).cloned())
            .expect("overrides should apply");

        assert_eq!(config.log_level, "warn");
        assert_eq!(config.missing_context, MissingContextPolicy::Deny);
        assert_eq!(config.log_dir, None);
    }

    #[test]
    fn env_override_rejects_unknown_policy() {
        let mut config = CoreConfig::default();
        let err = config
            .apply_overrides_from(|name| {
                (name == ENV_MISSING_CONTEXT).then(|| "sometimes".to_string())
            })
            .expect_err("unknown policy must be rejected");
        assert!(matches!(err, ConfigError::InvalidMissingContext(_)));
    }
}
