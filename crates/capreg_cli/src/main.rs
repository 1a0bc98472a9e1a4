//! Capability registry introspection CLI.
//!
//! # Responsibility
//! - Bootstrap a registry the same way a hosting process would at startup.
//! - Answer `list`, `get` and `check` queries against it for local checks.
//!
//! # Exit codes
//! - `0` success / allowed
//! - `1` error or capability not found
//! - `2` capability check denied

use anyhow::{Context, Result};
use capreg_core::{
    bootstrap_with_seeds, init_logging_from_config, CapabilityKey, CapabilityRegistry, CoreConfig,
    EvaluationContext, MissingContextPolicy, DEFAULT_VERSION,
};
use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Clone, Debug)]
#[command(name = "capreg", author, version, about, long_about = None)]
struct Cli {
    /// TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log level override (`trace|debug|info|warn|error`)
    #[arg(long, global = true)]
    log_level: Option<String>,
    /// Absolute directory for rolling log files
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Clone, Debug)]
enum Command {
    /// List every bootstrapped capability as JSON
    #[clap(aliases = &["ls", "l"])]
    List,
    /// Print one capability as JSON
    #[clap(aliases = &["g"])]
    Get {
        #[clap(flatten)]
        target: TargetArgs,
    },
    /// Check whether a capability may run for a context
    #[clap(aliases = &["c"])]
    Check {
        #[clap(flatten)]
        target: TargetArgs,
        /// Caller business/tenant id
        #[arg(short, long)]
        business_id: Option<String>,
        /// Caller country code
        #[arg(short, long)]
        country: Option<String>,
        /// Deny scoped capabilities when the context lacks the matching field
        #[arg(long)]
        strict: bool,
    },
}

#[derive(clap::Args, Clone, Debug)]
struct TargetArgs {
    /// Domain, or a full `<domain>:<name>[:v<version>]` key
    domain: String,
    /// Capability name; omit when `domain` is a full key
    name: Option<String>,
    /// Capability version (defaults to 1, or the version in a full key)
    #[arg(short = 'v', long = "capability-version")]
    version: Option<u32>,
}

impl TargetArgs {
    fn key(&self) -> Result<CapabilityKey> {
        match &self.name {
            Some(name) => Ok(CapabilityKey::new(
                self.domain.as_str(),
                name.as_str(),
                self.version.unwrap_or(DEFAULT_VERSION),
            )),
            None => {
                let mut key: CapabilityKey = self
                    .domain
                    .parse()
                    .with_context(|| format!("cannot parse capability key `{}`", self.domain))?;
                if let Some(version) = self.version {
                    key.version = version;
                }
                Ok(key)
            }
        }
    }
}

/// How a command finished; maps onto the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Success,
    NotFound,
    Denied,
}

impl Verdict {
    fn status(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::NotFound => 1,
            Self::Denied => 2,
        }
    }

    fn exit_code(self) -> ExitCode {
        ExitCode::from(self.status())
    }
}

/// Result of one dispatched command: its verdict and the text to print.
#[derive(Debug)]
struct Outcome {
    verdict: Verdict,
    output: String,
}

impl Outcome {
    fn new(verdict: Verdict, output: impl Into<String>) -> Self {
        Self {
            verdict,
            output: output.into(),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = load_config(&cli)?;
    init_logging_from_config(&config).map_err(anyhow::Error::msg)?;

    let registry = build_registry(&config, &cli.command)?;
    let outcome = execute(cli.command, &registry)?;
    match outcome.verdict {
        Verdict::NotFound => eprintln!("{}", outcome.output),
        Verdict::Success | Verdict::Denied => println!("{}", outcome.output),
    }
    Ok(outcome.verdict.exit_code())
}

/// Bootstraps the registry a command runs against. `check --strict` forces
/// [`MissingContextPolicy::Deny`].
fn build_registry(config: &CoreConfig, command: &Command) -> Result<CapabilityRegistry> {
    let policy = match command {
        Command::Check { strict: true, .. } => MissingContextPolicy::Deny,
        _ => config.missing_context,
    };
    let mut registry = CapabilityRegistry::with_policy(policy);
    let seeds = config.seed_capabilities()?;
    bootstrap_with_seeds(&mut registry, seeds).context("capability bootstrap failed")?;
    info!(
        "event=cli_ready module=cli status=ok capabilities={} policy={}",
        registry.len(),
        policy.as_str()
    );
    Ok(registry)
}

fn execute(command: Command, registry: &CapabilityRegistry) -> Result<Outcome> {
    match command {
        Command::List => {
            let mut capabilities = registry.list();
            capabilities.sort_by_key(|capability| capability.key());
            Ok(Outcome::new(Verdict::Success, render_json(&capabilities)?))
        }
        Command::Get { target } => {
            let key = target.key()?;
            match registry.get_by_key(&key) {
                Some(capability) => Ok(Outcome::new(Verdict::Success, render_json(capability)?)),
                None => Ok(Outcome::new(Verdict::NotFound, format!("not found: {key}"))),
            }
        }
        Command::Check {
            target,
            business_id,
            country,
            ..
        } => {
            let key = target.key()?;
            let context = EvaluationContext {
                business_id,
                country,
            };
            let decision = registry.evaluate(&key.domain, &key.name, &context, key.version);
            let verdict = if decision.is_allowed() {
                Verdict::Success
            } else {
                Verdict::Denied
            };
            Ok(Outcome::new(verdict, format!("{key} {decision}")))
        }
    }
}

fn load_config(cli: &Cli) -> Result<CoreConfig> {
    let mut config = match &cli.config {
        Some(path) => CoreConfig::load(path)?,
        None => CoreConfig::default(),
    };
    config.apply_env_overrides()?;

    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(dir) = &cli.log_dir {
        config.log_dir = Some(dir.clone());
    }
    config.validate()?;
    Ok(config)
}

fn render_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("failed to render JSON")
}

#[cfg(test)]
mod tests {
    use super::{build_registry, execute, Cli, Command, Outcome, Verdict};
    use capreg_core::CoreConfig;
    use clap::{CommandFactory, Parser};

    fn dispatch(config: &CoreConfig, args: &[&str]) -> Outcome {
        let cli = Cli::parse_from(std::iter::once("capreg").chain(args.iter().copied()));
        let registry = build_registry(config, &cli.command).expect("registry bootstrap");
        execute(cli.command, &registry).expect("command should run")
    }

    fn scoped_seed_config() -> CoreConfig {
        CoreConfig::from_toml_str(
            r#"
            [[seed]]
            domain = "commerce"
            name = "wishlist"
            scope = { business_ids = ["acme"] }
            "#,
        )
        .expect("scoped seed config")
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn check_accepts_full_key_form() {
        let cli = Cli::parse_from([
            "capreg",
            "check",
            "commerce:add_to_cart:v1",
            "--business-id",
            "amazon-like",
            "--country",
            "IN",
        ]);
        let Command::Check {
            target,
            business_id,
            country,
            strict,
        } = cli.command
        else {
            panic!("expected check command");
        };
        let key = target.key().expect("key should parse");
        assert_eq!(key.to_string(), "commerce:add_to_cart:v1");
        assert_eq!(business_id.as_deref(), Some("amazon-like"));
        assert_eq!(country.as_deref(), Some("IN"));
        assert!(!strict);
    }

    #[test]
    fn get_accepts_domain_name_and_version() {
        let cli = Cli::parse_from(["capreg", "get", "payments", "payment_capture", "-v", "2"]);
        let Command::Get { target } = cli.command else {
            panic!("expected get command");
        };
        assert_eq!(
            target.key().expect("key").to_string(),
            "payments:payment_capture:v2"
        );
    }

    #[test]
    fn check_allowed_prints_decision_and_exits_zero() {
        let outcome = dispatch(
            &CoreConfig::default(),
            &[
                "check",
                "commerce",
                "add_to_cart",
                "--business-id",
                "amazon-like",
                "--country",
                "IN",
            ],
        );
        assert_eq!(outcome.verdict, Verdict::Success);
        assert_eq!(outcome.output, "commerce:add_to_cart:v1 allowed");
        assert_eq!(outcome.verdict.status(), 0);
    }

    #[test]
    fn check_unregistered_is_denied_with_exit_two() {
        let outcome = dispatch(&CoreConfig::default(), &["check", "commerce", "hack_system"]);
        assert_eq!(outcome.verdict, Verdict::Denied);
        assert_eq!(
            outcome.output,
            "commerce:hack_system:v1 denied reason=not_registered"
        );
        assert_eq!(outcome.verdict.status(), 2);
    }

    #[test]
    fn get_missing_capability_reports_not_found_with_exit_one() {
        let outcome = dispatch(&CoreConfig::default(), &["get", "commerce:checkout:v9"]);
        assert_eq!(outcome.verdict, Verdict::NotFound);
        assert_eq!(outcome.output, "not found: commerce:checkout:v9");
        assert_eq!(outcome.verdict.status(), 1);
    }

    #[test]
    fn get_renders_registered_capability_as_json() {
        let outcome = dispatch(&CoreConfig::default(), &["get", "payments", "payment_capture"]);
        assert_eq!(outcome.verdict, Verdict::Success);
        let record: serde_json::Value =
            serde_json::from_str(&outcome.output).expect("get output should be JSON");
        assert_eq!(record["domain"], "payments");
        assert_eq!(record["status"], "enabled");
    }

    #[test]
    fn strict_check_denies_scoped_seed_without_business_id() {
        let config = scoped_seed_config();

        let lenient = dispatch(&config, &["check", "commerce", "wishlist"]);
        assert_eq!(lenient.verdict, Verdict::Success);
        assert_eq!(lenient.output, "commerce:wishlist:v1 allowed");

        let strict = dispatch(&config, &["check", "commerce", "wishlist", "--strict"]);
        assert_eq!(strict.verdict, Verdict::Denied);
        assert_eq!(
            strict.output,
            "commerce:wishlist:v1 denied reason=missing_business_id"
        );

        let member = dispatch(
            &config,
            &["check", "commerce", "wishlist", "--strict", "-b", "acme"],
        );
        assert_eq!(member.verdict, Verdict::Success);
    }
}
