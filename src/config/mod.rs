mod types;

pub use types::{DebuggerConfig, InvocationMode, RunnerConfig, QONTRACT_CLI};

use crate::utils::split_words;
use clap::{ArgAction, Parser};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_COMMAND: &str = "qontract-reconcile";
const DEFAULT_CONFIG_PATH: &str = "/config/config.toml";
const DEFAULT_SLEEP_DURATION_SECS: &str = "600";
const DEFAULT_DEBUGPY_PORT: &str = "5678";

/// Integration names as the reconciler registers them (e.g. `github-owners`)
static INTEGRATION_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9_-]*$").expect("valid integration name regex"));

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Integration name is required")]
    MissingIntegrationName,

    #[error("Invalid integration name: {0}")]
    InvalidIntegrationName(String),

    #[error("Command must not be empty")]
    EmptyCommand,

    #[error("{0} requires a subcommand (QONTRACT_CLI_COMMAND)")]
    MissingCliCommand(String),

    #[error("Debugger port must be non-zero")]
    InvalidDebuggerPort,
}

/// Spellings that turn a flag off. Everything else non-empty turns it on,
/// including the literal `--dry-run` the deployment's env has always carried.
const FALSEY_VALUES: &[&str] = &["false", "no", "n", "off", "0", "f"];

/// Interpret a boolean flag the way the shell `-n` test does: an empty value
/// means unset, any other value means set unless it is an explicit "false".
pub fn parse_flag(value: &str) -> Result<bool, std::convert::Infallible> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(false);
    }
    Ok(!FALSEY_VALUES
        .iter()
        .any(|falsey| value.eq_ignore_ascii_case(falsey)))
}

/// Integration Runner - runs a reconciliation integration in a loop
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Name of the integration to run
    #[arg(long, env = "INTEGRATION_NAME")]
    pub integration_name: Option<String>,

    /// Extra arguments appended after the integration name (whitespace separated)
    #[arg(long, env = "INTEGRATION_EXTRA_ARGS", default_value = "", allow_hyphen_values = true)]
    pub integration_extra_args: String,

    /// Pass --dry-run to the integration
    #[arg(long, env = "DRY_RUN", action = ArgAction::SetTrue, value_parser = parse_flag)]
    pub dry_run: bool,

    /// Run a single pass and exit with its exit code
    #[arg(long, env = "RUN_ONCE", action = ArgAction::SetTrue, value_parser = parse_flag)]
    pub run_once: bool,

    /// Seconds to sleep after a clean pass
    #[arg(long, env = "SLEEP_DURATION_SECS", default_value = DEFAULT_SLEEP_DURATION_SECS)]
    pub sleep_duration_secs: u64,

    /// File that all integration output is appended to
    #[arg(long, env = "LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Reconciler configuration file
    #[arg(long, env = "CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Reconciler executable
    #[arg(long, env = "COMMAND", default_value = DEFAULT_COMMAND)]
    pub command: String,

    /// Launch the reconciler under debugpy and wait for a client
    #[arg(long, env = "DEBUGGER", action = ArgAction::SetTrue, value_parser = parse_flag)]
    pub debugger: bool,

    /// Port debugpy listens on
    #[arg(long, env = "DEBUGPY_PORT", default_value = DEFAULT_DEBUGPY_PORT)]
    pub debugpy_port: u16,

    /// Subcommand to run when the command is qontract-cli (whitespace separated)
    #[arg(long, env = "QONTRACT_CLI_COMMAND", allow_hyphen_values = true)]
    pub qontract_cli_command: Option<String>,

    /// JSON file rewritten after every pass with the runner's latest state
    #[arg(long, env = "STATE_FILE")]
    pub state_file: Option<PathBuf>,
}

impl RunnerConfig {
    /// Validate parsed arguments into a runner configuration
    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        let command = args.command.trim().to_string();
        if command.is_empty() {
            return Err(ConfigError::EmptyCommand);
        }

        let mode = if command == QONTRACT_CLI {
            let subcommand = args
                .qontract_cli_command
                .as_deref()
                .map(split_words)
                .unwrap_or_default();

            if subcommand.is_empty() {
                return Err(ConfigError::MissingCliCommand(command));
            }

            InvocationMode::Cli { subcommand }
        } else {
            let name = args
                .integration_name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .ok_or(ConfigError::MissingIntegrationName)?;

            if !INTEGRATION_NAME_RE.is_match(&name) {
                return Err(ConfigError::InvalidIntegrationName(name));
            }

            InvocationMode::Integration {
                name,
                extra_args: split_words(&args.integration_extra_args),
                dry_run: args.dry_run,
            }
        };

        let debugger = if args.debugger {
            if args.debugpy_port == 0 {
                return Err(ConfigError::InvalidDebuggerPort);
            }
            Some(DebuggerConfig {
                port: args.debugpy_port,
            })
        } else {
            None
        };

        Ok(Self {
            command,
            config_path: args.config,
            mode,
            run_once: args.run_once,
            sleep: Duration::from_secs(args.sleep_duration_secs),
            log_file: args.log_file,
            state_file: args.state_file,
            debugger,
        })
    }
}
