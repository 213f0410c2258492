pub mod command;
pub mod config;
pub mod invoke;
pub mod logfile;
pub mod outcome;
pub mod state;
pub mod supervisor;
pub mod utils;

// Re-export commonly used types
pub use command::{CommandError, CommandLine};
pub use config::{Args, ConfigError, DebuggerConfig, InvocationMode, RunnerConfig};
pub use invoke::{InvokeError, Invoker, ProcessInvoker};
pub use logfile::{LogError, LogSink};
pub use outcome::{PassOutcome, CHANGES_APPLIED_EXIT_CODE};
pub use state::{read_state, write_state, PassRecord, RunnerState, StateError};
pub use supervisor::{
    decide, exit_status_byte, shutdown_channel, spawn_signal_listener, RunSummary, ShutdownSignal,
    Sleeper, Step, Supervisor, SupervisorError, TokioSleeper,
};
