//! Optional JSON state file describing the runner's most recent pass.

mod types;

pub use types::{PassRecord, RunnerState, STATE_SCHEMA_VERSION};

use std::path::Path;
use thiserror::Error;
use tokio::fs;

#[derive(Error, Debug)]
pub enum StateError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Read the state file, `None` if it does not exist yet
pub async fn read_state(path: &Path) -> Result<Option<RunnerState>, StateError> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path).await?;
    let state: RunnerState = serde_json::from_str(&content)?;
    Ok(Some(state))
}

/// Write the state file atomically
pub async fn write_state(path: &Path, state: &RunnerState) -> Result<(), StateError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }

    // Write atomically using temp file + rename
    let temp_path = path.with_extension("json.tmp");
    let content = serde_json::to_string_pretty(state)?;
    fs::write(&temp_path, &content).await?;
    fs::rename(&temp_path, path).await?;

    Ok(())
}
