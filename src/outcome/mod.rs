//! Typed result of a single reconciliation pass.
//!
//! The reconciler reports through its exit code: 0 means a clean pass with
//! nothing to do, 3 means changes were applied and the integration is healthy,
//! anything else is fatal. This module is the only place that knows those
//! numbers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::process::ExitStatus;

/// Exit code the reconciler uses to report "changes applied, still healthy".
pub const CHANGES_APPLIED_EXIT_CODE: i32 = 3;

/// Exit code used when a child ends without a code or a signal.
const UNKNOWN_EXIT_CODE: i32 = 1;

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "code")]
pub enum PassOutcome {
    /// Clean pass, no changes.
    Clean,
    /// Changes were applied; the integration wants to run again right away.
    ChangesApplied,
    /// Any other exit code.
    Fatal(i32),
}

impl PassOutcome {
    /// Classify a raw exit code.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => PassOutcome::Clean,
            CHANGES_APPLIED_EXIT_CODE => PassOutcome::ChangesApplied,
            other => PassOutcome::Fatal(other),
        }
    }

    /// Classify the exit status of a finished child process.
    ///
    /// A child killed by a signal is reported the way a shell would, as
    /// `128 + signal`.
    pub fn from_status(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return Self::from_code(code);
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return PassOutcome::Fatal(128 + signal);
            }
        }

        PassOutcome::Fatal(UNKNOWN_EXIT_CODE)
    }

    /// The exit code this outcome corresponds to.
    pub fn exit_code(&self) -> i32 {
        match self {
            PassOutcome::Clean => 0,
            PassOutcome::ChangesApplied => CHANGES_APPLIED_EXIT_CODE,
            PassOutcome::Fatal(code) => *code,
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, PassOutcome::Fatal(_))
    }
}

impl fmt::Display for PassOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassOutcome::Clean => write!(f, "clean"),
            PassOutcome::ChangesApplied => write!(f, "changes applied"),
            PassOutcome::Fatal(code) => write!(f, "fatal (exit code {})", code),
        }
    }
}
