#![allow(dead_code)]

use async_trait::async_trait;
use integration_runner::{
    InvocationMode, InvokeError, Invoker, PassOutcome, RunnerConfig, Sleeper,
};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Create a temporary directory for testing
pub fn create_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// A configuration for the `github-owners` integration with sensible test defaults
pub fn test_config(sleep: Duration, run_once: bool) -> RunnerConfig {
    RunnerConfig {
        command: "qontract-reconcile".to_string(),
        config_path: PathBuf::from("/config/config.toml"),
        mode: InvocationMode::Integration {
            name: "github-owners".to_string(),
            extra_args: vec![],
            dry_run: false,
        },
        run_once,
        sleep,
        log_file: None,
        state_file: None,
        debugger: None,
    }
}

/// Something that happened while the supervisor ran
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Pass(u64),
    Sleep(Duration),
}

pub type EventLog = Arc<Mutex<Vec<Event>>>;

pub fn new_event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn events(log: &EventLog) -> Vec<Event> {
    log.lock().unwrap().clone()
}

/// Invoker that replays a fixed sequence of exit codes
pub struct ScriptedInvoker {
    codes: Mutex<VecDeque<i32>>,
    log: EventLog,
}

impl ScriptedInvoker {
    pub fn new(codes: &[i32], log: EventLog) -> Self {
        Self {
            codes: Mutex::new(codes.iter().copied().collect()),
            log,
        }
    }
}

#[async_trait]
impl Invoker for ScriptedInvoker {
    async fn run_pass(&self, pass: u64) -> Result<PassOutcome, InvokeError> {
        self.log.lock().unwrap().push(Event::Pass(pass));
        let code = self
            .codes
            .lock()
            .unwrap()
            .pop_front()
            .expect("supervisor ran more passes than scripted");
        Ok(PassOutcome::from_code(code))
    }
}

/// Sleeper that records the requested duration and returns at once
pub struct RecordingSleeper {
    log: EventLog,
}

impl RecordingSleeper {
    pub fn new(log: EventLog) -> Self {
        Self { log }
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.log.lock().unwrap().push(Event::Sleep(duration));
    }
}

/// Sleeper that never wakes up
pub struct PendingSleeper;

#[async_trait]
impl Sleeper for PendingSleeper {
    async fn sleep(&self, _duration: Duration) {
        std::future::pending::<()>().await;
    }
}

/// Write a shell script standing in for the reconciler, run via `/bin/sh`.
///
/// Each run increments a counter kept next to the script, prints
/// `pass <n>` on stdout and `warn <n>` on stderr, then exits with the
/// n-th code from `codes` (the last code repeats).
pub fn write_fake_reconciler(dir: &Path, codes: &[i32]) -> PathBuf {
    let counter = dir.join("counter");
    let cases: String = codes
        .iter()
        .enumerate()
        .map(|(i, code)| format!("  {}) exit {} ;;\n", i + 1, code))
        .collect();
    let last = codes.last().copied().unwrap_or(0);

    let script = format!(
        "#!/bin/sh\n\
         n=$(cat \"{counter}\" 2>/dev/null || echo 0)\n\
         n=$((n + 1))\n\
         echo \"$n\" > \"{counter}\"\n\
         echo \"pass $n\"\n\
         echo \"warn $n\" >&2\n\
         case \"$n\" in\n{cases}  *) exit {last} ;;\nesac\n",
        counter = counter.display(),
        cases = cases,
        last = last,
    );

    let path = dir.join("fake-reconciler.sh");
    std::fs::write(&path, script).expect("Should write fake reconciler");
    path
}
