//! The reconciliation loop.
//!
//! Each iteration runs one pass through an [`Invoker`], classifies the exit
//! code, then either runs again immediately, sleeps and runs again, or exits.
//! Passes never overlap.

mod decide;
mod shutdown;
mod sleeper;

pub use decide::{decide, Step};
pub use shutdown::{shutdown_channel, spawn_signal_listener, ShutdownSignal};
pub use sleeper::{Sleeper, TokioSleeper};

use crate::config::RunnerConfig;
use crate::invoke::{InvokeError, Invoker};
use crate::state::{write_state, PassRecord, RunnerState};
use chrono::Utc;
use shutdown::{wait_for_shutdown, wait_for_terminate};
use std::time::Instant;
use thiserror::Error;
use tokio::select;
use tokio::sync::watch;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("Invocation error: {0}")]
    InvokeError(#[from] InvokeError),
}

/// How the loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Exit code the runner should exit with
    pub exit_code: i32,
    /// Number of passes started
    pub passes: u64,
    pub last_pass: Option<PassRecord>,
}

/// Map an exit code onto the 0-255 range a process can report, as a shell does
pub fn exit_status_byte(code: i32) -> u8 {
    (code & 0xff) as u8
}

fn summary(exit_code: i32, passes: u64, last_pass: Option<PassRecord>) -> RunSummary {
    RunSummary {
        exit_code,
        passes,
        last_pass,
    }
}

pub struct Supervisor<I, S = TokioSleeper> {
    config: RunnerConfig,
    invoker: I,
    sleeper: S,
    shutdown_rx: watch::Receiver<ShutdownSignal>,
    run_id: Uuid,
}

impl<I: Invoker> Supervisor<I, TokioSleeper> {
    pub fn new(config: RunnerConfig, invoker: I) -> Self {
        let (_shutdown_tx, shutdown_rx) = shutdown_channel();

        Self {
            config,
            invoker,
            sleeper: TokioSleeper,
            shutdown_rx,
            run_id: Uuid::new_v4(),
        }
    }
}

impl<I: Invoker, S: Sleeper> Supervisor<I, S> {
    /// Replace the sleeper used between clean passes
    pub fn with_sleeper<T: Sleeper>(self, sleeper: T) -> Supervisor<I, T> {
        Supervisor {
            config: self.config,
            invoker: self.invoker,
            sleeper,
            shutdown_rx: self.shutdown_rx,
            run_id: self.run_id,
        }
    }

    /// Listen for shutdown requests on this channel
    pub fn with_shutdown(mut self, shutdown_rx: watch::Receiver<ShutdownSignal>) -> Self {
        self.shutdown_rx = shutdown_rx;
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Run passes until a pass is fatal, run-once mode ends the loop, or a
    /// shutdown is requested.
    pub async fn run(&mut self) -> Result<RunSummary, SupervisorError> {
        let span = info_span!(
            "supervisor",
            run_id = %self.run_id,
            integration = %self.config.display_name()
        );
        self.run_loop().instrument(span).await
    }

    async fn run_loop(&mut self) -> Result<RunSummary, SupervisorError> {
        let mut state = RunnerState::new(self.run_id.to_string(), self.config.display_name());
        let mut pass: u64 = 0;

        info!(
            run_once = self.config.run_once,
            dry_run = self.config.is_dry_run(),
            sleep_secs = self.config.sleep.as_secs(),
            "Starting supervisor"
        );

        loop {
            pass += 1;

            let started_at = Utc::now();
            let timer = Instant::now();
            info!(pass, "Starting reconciliation pass");

            // Dropping the pass future kills the child process
            let result = select! {
                result = self.invoker.run_pass(pass) => result,
                exit_code = wait_for_terminate(&mut self.shutdown_rx) => {
                    warn!(pass, exit_code, "Reconciliation pass terminated");
                    return Ok(summary(exit_code, pass, None));
                }
            };

            let outcome = match result {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(pass, error = %e, "Reconciliation pass could not run");
                    return Err(e.into());
                }
            };

            let record = PassRecord {
                pass,
                outcome,
                exit_code: outcome.exit_code(),
                started_at: started_at.to_rfc3339(),
                finished_at: Utc::now().to_rfc3339(),
                duration_ms: timer.elapsed().as_millis() as u64,
            };

            if outcome.is_fatal() {
                warn!(
                    pass,
                    exit_code = record.exit_code,
                    duration_ms = record.duration_ms,
                    "Reconciliation pass failed"
                );
            } else {
                info!(
                    pass,
                    outcome = %outcome,
                    duration_ms = record.duration_ms,
                    "Reconciliation pass finished"
                );
            }

            state.record(record.clone());
            self.persist_state(&state).await;
            let last_pass = Some(record);

            let step = decide(outcome, self.config.run_once, self.config.sleep);

            let duration = match step {
                Step::Exit(exit_code) => {
                    info!(exit_code, passes = pass, "Supervisor exiting");
                    return Ok(summary(exit_code, pass, last_pass));
                }
                _ if self.shutdown_requested() => {
                    let exit_code = self.shutdown_exit_code();
                    info!(exit_code, passes = pass, "Shutdown requested, exiting");
                    return Ok(summary(exit_code, pass, last_pass));
                }
                Step::RunImmediately => {
                    debug!(pass, "Changes applied, running again immediately");
                    continue;
                }
                Step::SleepThenRun(duration) => duration,
            };

            debug!(pass, sleep_secs = duration.as_secs(), "Sleeping before next pass");

            select! {
                _ = self.sleeper.sleep(duration) => {}
                _ = wait_for_shutdown(&mut self.shutdown_rx) => {
                    info!(passes = pass, "Shutdown requested while sleeping, exiting");
                    return Ok(summary(0, pass, last_pass));
                }
            }
        }
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown_rx.borrow().is_requested()
    }

    /// Exit code for a loop stopped by a shutdown request between passes
    fn shutdown_exit_code(&self) -> i32 {
        match *self.shutdown_rx.borrow() {
            ShutdownSignal::Terminate { exit_code } => exit_code,
            _ => 0,
        }
    }

    /// Write the state file if one is configured. Failures do not stop the loop.
    async fn persist_state(&self, state: &RunnerState) {
        let Some(path) = &self.config.state_file else {
            return;
        };

        if let Err(e) = write_state(path, state).await {
            warn!(path = %path.display(), error = %e, "Failed to write state file");
        }
    }
}
