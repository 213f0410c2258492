//! Assembles the reconciler command line from the runner configuration.

use crate::config::{InvocationMode, RunnerConfig};
use std::fmt;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;

/// Interpreter used to host debugpy
const PYTHON: &str = "python3";

/// Address debugpy binds to inside the container
const DEBUGPY_LISTEN_HOST: &str = "0.0.0.0";

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Failed to resolve {0} on PATH: {1}")]
    ResolveError(String, which::Error),
}

/// A program and its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build the command line for one reconciliation pass.
    ///
    /// Integration mode:
    /// `<command> --config <config> [--dry-run] <integration> <extra args...>`
    ///
    /// CLI mode:
    /// `<command> --config <config> <subcommand...>`
    ///
    /// With a debugger configured the program is resolved on `PATH` and run
    /// under `python3 -m debugpy`.
    pub fn from_config(config: &RunnerConfig) -> Result<Self, CommandError> {
        let mut args = vec![
            "--config".to_string(),
            config.config_path.to_string_lossy().to_string(),
        ];

        match &config.mode {
            InvocationMode::Integration {
                name,
                extra_args,
                dry_run,
            } => {
                if *dry_run {
                    args.push("--dry-run".to_string());
                }
                args.push(name.clone());
                args.extend(extra_args.iter().cloned());
            }
            InvocationMode::Cli { subcommand } => {
                args.extend(subcommand.iter().cloned());
            }
        }

        let Some(debugger) = config.debugger else {
            return Ok(Self::new(config.command.clone(), args));
        };

        let program_path = which::which(&config.command)
            .map_err(|e| CommandError::ResolveError(config.command.clone(), e))?;

        let mut debug_args = vec![
            "-m".to_string(),
            "debugpy".to_string(),
            "--listen".to_string(),
            format!("{}:{}", DEBUGPY_LISTEN_HOST, debugger.port),
            "--wait-for-client".to_string(),
            program_path.to_string_lossy().to_string(),
        ];
        debug_args.extend(args);

        Ok(Self::new(PYTHON, debug_args))
    }

    /// A process builder with stdout and stderr piped back to the runner
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}
