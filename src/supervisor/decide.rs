use crate::outcome::PassOutcome;
use std::time::Duration;

/// What the loop does after evaluating a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Start the next pass right away
    RunImmediately,
    /// Sleep, then start the next pass
    SleepThenRun(Duration),
    /// Stop the loop with this exit code
    Exit(i32),
}

/// Decide the next step from a pass outcome.
///
/// Run-once mode always exits with the pass's own code. Otherwise changes
/// applied loops immediately, a clean pass sleeps first, and anything fatal
/// ends the loop.
pub fn decide(outcome: PassOutcome, run_once: bool, sleep: Duration) -> Step {
    if run_once {
        return Step::Exit(outcome.exit_code());
    }

    match outcome {
        PassOutcome::Clean => Step::SleepThenRun(sleep),
        PassOutcome::ChangesApplied => Step::RunImmediately,
        PassOutcome::Fatal(code) => Step::Exit(code),
    }
}
