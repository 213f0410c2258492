//! Append-only log file for reconciler output.
//!
//! The file is opened in append mode for every pass, so output from earlier
//! passes is never truncated.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;

#[derive(Error, Debug)]
pub enum LogError {
    #[error("Failed to open log file {0}: {1}")]
    OpenError(PathBuf, std::io::Error),

    #[error("Failed to write log file: {0}")]
    WriteError(#[from] std::io::Error),
}

/// Destination for reconciler output
#[derive(Debug)]
pub struct LogSink {
    file: Option<File>,
}

impl LogSink {
    /// Open `path` for appending, creating it and its parent directories.
    /// `None` yields a sink that discards everything.
    pub async fn open(path: Option<&Path>) -> Result<Self, LogError> {
        let Some(path) = path else {
            return Ok(Self::disabled());
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| LogError::OpenError(path.to_path_buf(), e))?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| LogError::OpenError(path.to_path_buf(), e))?;

        Ok(Self { file: Some(file) })
    }

    pub fn disabled() -> Self {
        Self { file: None }
    }

    /// Append raw bytes exactly as received, flushing so they survive a
    /// crash of the runner
    pub async fn append(&mut self, bytes: &[u8]) -> Result<(), LogError> {
        if let Some(file) = self.file.as_mut() {
            file.write_all(bytes).await?;
            file.flush().await?;
        }
        Ok(())
    }
}
