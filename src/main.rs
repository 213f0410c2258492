use clap::Parser;
use integration_runner::{
    exit_status_byte, shutdown_channel, spawn_signal_listener, Args, CommandLine, ProcessInvoker,
    RunnerConfig, Supervisor,
};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Parse and validate configuration before the first pass
    let args = Args::parse();
    let config = match RunnerConfig::from_args(args) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Ok(ExitCode::FAILURE);
        }
    };

    let command = match CommandLine::from_config(&config) {
        Ok(command) => command,
        Err(e) => {
            error!(error = %e, "Failed to build reconciler command");
            return Ok(ExitCode::FAILURE);
        }
    };

    // Create shutdown signal channel
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    spawn_signal_listener(shutdown_tx)?;

    let invoker = ProcessInvoker::new(command, config.log_file.clone());

    info!(
        command = %invoker.command(),
        log_file = ?config.log_file,
        "Running {}",
        config.display_name()
    );

    let mut supervisor = Supervisor::new(config, invoker).with_shutdown(shutdown_rx);

    match supervisor.run().await {
        Ok(summary) => Ok(ExitCode::from(exit_status_byte(summary.exit_code))),
        Err(e) => {
            error!(error = %e, "Supervisor stopped");
            Ok(ExitCode::FAILURE)
        }
    }
}
