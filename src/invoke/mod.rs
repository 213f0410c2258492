//! Runs a single reconciliation pass.

use crate::command::CommandLine;
use crate::logfile::{LogError, LogSink};
use crate::outcome::PassOutcome;
use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tracing::debug;

/// Bytes read from a child pipe at a time
const CHUNK_SIZE: usize = 8 * 1024;

/// Chunks buffered between the pipe readers and the writer
const CHUNK_QUEUE: usize = 64;

#[derive(Error, Debug)]
pub enum InvokeError {
    #[error("Failed to start {0}: {1}")]
    SpawnError(String, std::io::Error),

    #[error("Child process {0} was not captured")]
    MissingPipe(&'static str),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Log error: {0}")]
    LogError(#[from] LogError),

    #[error("Output reader failed: {0}")]
    ReaderError(#[from] JoinError),
}

/// Executes one reconciliation pass and reports its outcome.
///
/// The supervisor only talks to this trait, so the loop can be driven by
/// a real child process or by a scripted sequence of outcomes.
#[async_trait]
pub trait Invoker: Send + Sync {
    /// Run pass number `pass` (1-based) to completion.
    async fn run_pass(&self, pass: u64) -> Result<PassOutcome, InvokeError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

struct Chunk {
    stream: Stream,
    bytes: Vec<u8>,
}

/// Invoker that spawns the reconciler as a child process
pub struct ProcessInvoker {
    command: CommandLine,
    log_file: Option<PathBuf>,
    echo: bool,
}

impl ProcessInvoker {
    pub fn new(command: CommandLine, log_file: Option<PathBuf>) -> Self {
        Self {
            command,
            log_file,
            echo: true,
        }
    }

    /// Whether child output is also copied to the runner's stdout/stderr
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn command(&self) -> &CommandLine {
        &self.command
    }
}

#[async_trait]
impl Invoker for ProcessInvoker {
    async fn run_pass(&self, pass: u64) -> Result<PassOutcome, InvokeError> {
        // Reopened every pass so the file is only ever appended to
        let mut sink = LogSink::open(self.log_file.as_deref()).await?;

        debug!(pass, command = %self.command, "Spawning reconciler");

        let mut child = self
            .command
            .to_command()
            .spawn()
            .map_err(|e| InvokeError::SpawnError(self.command.program.clone(), e))?;

        let stdout = child.stdout.take().ok_or(InvokeError::MissingPipe("stdout"))?;
        let stderr = child.stderr.take().ok_or(InvokeError::MissingPipe("stderr"))?;

        let (chunk_tx, mut chunk_rx) = mpsc::channel(CHUNK_QUEUE);
        let stdout_reader = spawn_reader(stdout, Stream::Stdout, chunk_tx.clone());
        let stderr_reader = spawn_reader(stderr, Stream::Stderr, chunk_tx);

        let mut runner_stdout = tokio::io::stdout();
        let mut runner_stderr = tokio::io::stderr();

        // Output is forwarded byte for byte, in the order it was read
        while let Some(chunk) = chunk_rx.recv().await {
            match chunk.stream {
                Stream::Stdout => {
                    self.forward(&mut sink, &mut runner_stdout, &chunk.bytes)
                        .await?
                }
                Stream::Stderr => {
                    self.forward(&mut sink, &mut runner_stderr, &chunk.bytes)
                        .await?
                }
            }
        }

        stdout_reader.await??;
        stderr_reader.await??;

        let status = child.wait().await?;
        Ok(PassOutcome::from_status(status))
    }
}

impl ProcessInvoker {
    async fn forward<W>(
        &self,
        sink: &mut LogSink,
        echo_to: &mut W,
        bytes: &[u8],
    ) -> Result<(), InvokeError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        if self.echo {
            echo_to.write_all(bytes).await?;
            echo_to.flush().await?;
        }

        sink.append(bytes).await?;
        Ok(())
    }
}

/// Copy a child pipe into the chunk queue until EOF or until the receiver
/// goes away
fn spawn_reader<R>(
    mut reader: R,
    stream: Stream,
    chunk_tx: mpsc::Sender<Chunk>,
) -> JoinHandle<std::io::Result<()>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                return Ok(());
            }

            let chunk = Chunk {
                stream,
                bytes: buf[..n].to_vec(),
            };
            if chunk_tx.send(chunk).await.is_err() {
                return Ok(());
            }
        }
    })
}
