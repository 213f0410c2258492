use tokio::sync::watch;
use tracing::{info, warn};

/// Exit code reported after a second SIGINT
const SIGINT_EXIT_CODE: i32 = 130;

/// Exit code reported after a second SIGTERM
#[cfg(unix)]
const SIGTERM_EXIT_CODE: i32 = 143;

/// Shutdown requests delivered to the supervisor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShutdownSignal {
    #[default]
    None,
    /// Stop once the current pass has finished
    Shutdown,
    /// Kill the current pass and exit with this code
    Terminate { exit_code: i32 },
}

impl ShutdownSignal {
    pub fn is_requested(&self) -> bool {
        !matches!(self, ShutdownSignal::None)
    }
}

/// Create the channel the supervisor listens on
pub fn shutdown_channel() -> (watch::Sender<ShutdownSignal>, watch::Receiver<ShutdownSignal>) {
    watch::channel(ShutdownSignal::None)
}

/// Forward termination signals to the shutdown channel.
///
/// The first signal asks the supervisor to stop after the current pass, the
/// second kills the pass.
#[cfg(unix)]
pub fn spawn_signal_listener(
    shutdown_tx: watch::Sender<ShutdownSignal>,
) -> std::io::Result<tokio::task::JoinHandle<()>> {
    use tokio::select;
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    Ok(tokio::spawn(async move {
        let mut received = 0u32;
        loop {
            let (name, exit_code) = select! {
                _ = sigterm.recv() => ("SIGTERM", SIGTERM_EXIT_CODE),
                _ = sigint.recv() => ("SIGINT", SIGINT_EXIT_CODE),
            };
            received += 1;

            if !escalate(&shutdown_tx, name, exit_code, received) {
                return;
            }
        }
    }))
}

/// Forward Ctrl-C to the shutdown channel
#[cfg(not(unix))]
pub fn spawn_signal_listener(
    shutdown_tx: watch::Sender<ShutdownSignal>,
) -> std::io::Result<tokio::task::JoinHandle<()>> {
    Ok(tokio::spawn(async move {
        let mut received = 0u32;
        loop {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            received += 1;

            if !escalate(&shutdown_tx, "Ctrl-C", SIGINT_EXIT_CODE, received) {
                return;
            }
        }
    }))
}

/// Publish the shutdown level for the `received`-th signal. Returns whether
/// the listener should keep waiting for more signals.
fn escalate(
    shutdown_tx: &watch::Sender<ShutdownSignal>,
    name: &str,
    exit_code: i32,
    received: u32,
) -> bool {
    let signal = if received == 1 {
        info!("{} received, stopping after the current pass", name);
        ShutdownSignal::Shutdown
    } else {
        warn!("{} received again, terminating the current pass", name);
        ShutdownSignal::Terminate { exit_code }
    };

    if shutdown_tx.send(signal).is_err() {
        warn!("Supervisor already stopped");
        return false;
    }

    received == 1
}

/// Resolve once a shutdown has been requested. A closed channel never resolves.
pub(super) async fn wait_for_shutdown(rx: &mut watch::Receiver<ShutdownSignal>) {
    loop {
        if rx.borrow_and_update().is_requested() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Resolve with the exit code once termination has been requested. A closed
/// channel never resolves.
pub(super) async fn wait_for_terminate(rx: &mut watch::Receiver<ShutdownSignal>) -> i32 {
    loop {
        if let ShutdownSignal::Terminate { exit_code } = *rx.borrow_and_update() {
            return exit_code;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
