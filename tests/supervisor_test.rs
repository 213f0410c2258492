mod common;

use common::{
    create_test_dir, events, new_event_log, test_config, Event, PendingSleeper, RecordingSleeper,
    ScriptedInvoker,
};
use integration_runner::{
    read_state, shutdown_channel, PassOutcome, ShutdownSignal, Supervisor,
};
use std::time::Duration;

const SLEEP: Duration = Duration::from_secs(600);

// ============ Retry Loop Tests ============

#[tokio::test]
async fn test_mixed_sequence_sleeps_after_clean_passes_only() {
    let log = new_event_log();
    let invoker = ScriptedInvoker::new(&[0, 3, 0, 7], log.clone());
    let mut supervisor = Supervisor::new(test_config(SLEEP, false), invoker)
        .with_sleeper(RecordingSleeper::new(log.clone()));

    let summary = supervisor.run().await.expect("Should run");

    assert_eq!(summary.exit_code, 7);
    assert_eq!(summary.passes, 4);
    assert_eq!(
        events(&log),
        vec![
            Event::Pass(1),
            Event::Sleep(SLEEP),
            Event::Pass(2),
            Event::Pass(3),
            Event::Sleep(SLEEP),
            Event::Pass(4),
        ]
    );
}

#[tokio::test]
async fn test_changes_applied_reruns_without_sleeping() {
    let log = new_event_log();
    let invoker = ScriptedInvoker::new(&[3, 3, 3, 1], log.clone());
    let mut supervisor = Supervisor::new(test_config(SLEEP, false), invoker)
        .with_sleeper(RecordingSleeper::new(log.clone()));

    let summary = supervisor.run().await.expect("Should run");

    assert_eq!(summary.exit_code, 1);
    assert!(
        !events(&log).iter().any(|e| matches!(e, Event::Sleep(_))),
        "Exit code 3 must never sleep"
    );
    assert_eq!(summary.passes, 4);
}

#[tokio::test]
async fn test_fatal_code_is_propagated() {
    for code in [1, 2, 4, 42, 255] {
        let log = new_event_log();
        let invoker = ScriptedInvoker::new(&[code], log.clone());
        let mut supervisor = Supervisor::new(test_config(SLEEP, false), invoker)
            .with_sleeper(RecordingSleeper::new(log.clone()));

        let summary = supervisor.run().await.expect("Should run");

        assert_eq!(summary.exit_code, code);
        assert_eq!(summary.passes, 1);
        assert_eq!(events(&log), vec![Event::Pass(1)]);
    }
}

#[tokio::test]
async fn test_clean_pass_sleeps_configured_duration() {
    let log = new_event_log();
    let sleep = Duration::from_secs(37);
    let invoker = ScriptedInvoker::new(&[0, 0, 9], log.clone());
    let mut supervisor = Supervisor::new(test_config(sleep, false), invoker)
        .with_sleeper(RecordingSleeper::new(log.clone()));

    supervisor.run().await.expect("Should run");

    let sleeps: Vec<_> = events(&log)
        .into_iter()
        .filter_map(|e| match e {
            Event::Sleep(d) => Some(d),
            Event::Pass(_) => None,
        })
        .collect();
    assert_eq!(sleeps, vec![sleep, sleep]);
}

// ============ Run-once Tests ============

#[tokio::test]
async fn test_run_once_runs_exactly_one_pass() {
    for code in [0, 3, 7] {
        let log = new_event_log();
        let invoker = ScriptedInvoker::new(&[code, 0, 0], log.clone());
        let mut supervisor = Supervisor::new(test_config(SLEEP, true), invoker)
            .with_sleeper(RecordingSleeper::new(log.clone()));

        let summary = supervisor.run().await.expect("Should run");

        assert_eq!(summary.exit_code, code);
        assert_eq!(summary.passes, 1);
        assert_eq!(events(&log), vec![Event::Pass(1)]);
        assert_eq!(
            summary.last_pass.expect("Should record the pass").outcome,
            PassOutcome::from_code(code)
        );
    }
}

// ============ Shutdown Tests ============

#[tokio::test]
async fn test_shutdown_requested_before_sleep_exits_cleanly() {
    let log = new_event_log();
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    shutdown_tx.send(ShutdownSignal::Shutdown).unwrap();

    let invoker = ScriptedInvoker::new(&[3, 0], log.clone());
    let mut supervisor = Supervisor::new(test_config(SLEEP, false), invoker)
        .with_sleeper(RecordingSleeper::new(log.clone()))
        .with_shutdown(shutdown_rx);

    let summary = supervisor.run().await.expect("Should run");

    assert_eq!(summary.exit_code, 0);
    assert_eq!(summary.passes, 1);
    assert_eq!(events(&log), vec![Event::Pass(1)]);
}

#[tokio::test]
async fn test_shutdown_does_not_mask_fatal_code() {
    let log = new_event_log();
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    shutdown_tx.send(ShutdownSignal::Shutdown).unwrap();

    let invoker = ScriptedInvoker::new(&[5], log.clone());
    let mut supervisor = Supervisor::new(test_config(SLEEP, false), invoker)
        .with_sleeper(RecordingSleeper::new(log.clone()))
        .with_shutdown(shutdown_rx);

    let summary = supervisor.run().await.expect("Should run");
    assert_eq!(summary.exit_code, 5);
}

#[tokio::test]
async fn test_shutdown_interrupts_sleep() {
    let log = new_event_log();
    let (shutdown_tx, shutdown_rx) = shutdown_channel();

    let invoker = ScriptedInvoker::new(&[0], log.clone());
    let mut supervisor = Supervisor::new(test_config(SLEEP, false), invoker)
        .with_sleeper(PendingSleeper)
        .with_shutdown(shutdown_rx);

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(ShutdownSignal::Shutdown).unwrap();
    });

    let summary = tokio::time::timeout(Duration::from_secs(5), supervisor.run())
        .await
        .expect("Shutdown should interrupt the sleep")
        .expect("Should run");

    assert_eq!(summary.exit_code, 0);
    assert_eq!(summary.passes, 1);
}

// ============ State File Tests ============

#[tokio::test]
async fn test_state_file_tracks_last_pass() {
    let temp_dir = create_test_dir();
    let state_path = temp_dir.path().join("state/runner.json");

    let mut config = test_config(SLEEP, false);
    config.state_file = Some(state_path.clone());

    let log = new_event_log();
    let invoker = ScriptedInvoker::new(&[0, 3, 7], log.clone());
    let mut supervisor =
        Supervisor::new(config, invoker).with_sleeper(RecordingSleeper::new(log.clone()));
    let run_id = supervisor.run_id().to_string();

    supervisor.run().await.expect("Should run");

    let state = read_state(&state_path)
        .await
        .expect("Should read state")
        .expect("State file should exist");

    assert_eq!(state.run_id, run_id);
    assert_eq!(state.integration, "github-owners");
    assert_eq!(state.passes_completed, 3);

    let last = state.last_pass.expect("Should have a last pass");
    assert_eq!(last.pass, 3);
    assert_eq!(last.outcome, PassOutcome::Fatal(7));
    assert_eq!(last.exit_code, 7);
    assert!(chrono::DateTime::parse_from_rfc3339(&last.started_at).is_ok());
    assert!(chrono::DateTime::parse_from_rfc3339(&last.finished_at).is_ok());
}

#[tokio::test]
async fn test_unwritable_state_file_does_not_stop_loop() {
    let temp_dir = create_test_dir();
    // A directory in place of the state file makes the rename fail
    let state_path = temp_dir.path().join("state.json");
    std::fs::create_dir_all(state_path.join("occupied")).unwrap();

    let mut config = test_config(SLEEP, false);
    config.state_file = Some(state_path);

    let log = new_event_log();
    let invoker = ScriptedInvoker::new(&[0, 2], log.clone());
    let mut supervisor =
        Supervisor::new(config, invoker).with_sleeper(RecordingSleeper::new(log.clone()));

    let summary = supervisor.run().await.expect("Should run");
    assert_eq!(summary.exit_code, 2);
    assert_eq!(summary.passes, 2);
}
