use std::path::PathBuf;
use std::time::Duration;

/// Executable that selects CLI mode instead of running an integration.
pub const QONTRACT_CLI: &str = "qontract-cli";

/// What the reconciler is asked to do on each pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationMode {
    /// Run a named integration
    Integration {
        name: String,
        extra_args: Vec<String>,
        dry_run: bool,
    },
    /// Run a `qontract-cli` subcommand
    Cli { subcommand: Vec<String> },
}

/// Remote debugger attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebuggerConfig {
    pub port: u16,
}

/// Validated runner configuration, built once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Reconciler executable
    pub command: String,
    /// Config file handed to the reconciler via `--config`
    pub config_path: PathBuf,
    pub mode: InvocationMode,
    /// Stop after a single pass
    pub run_once: bool,
    /// Pause after a clean pass
    pub sleep: Duration,
    pub log_file: Option<PathBuf>,
    pub state_file: Option<PathBuf>,
    pub debugger: Option<DebuggerConfig>,
}

impl RunnerConfig {
    /// Name used to label logs and the state file
    pub fn display_name(&self) -> String {
        match &self.mode {
            InvocationMode::Integration { name, .. } => name.clone(),
            InvocationMode::Cli { subcommand } => {
                format!("{} {}", self.command, subcommand.join(" "))
            }
        }
    }

    pub fn is_dry_run(&self) -> bool {
        matches!(self.mode, InvocationMode::Integration { dry_run: true, .. })
    }
}
