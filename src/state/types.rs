use crate::outcome::PassOutcome;
use serde::{Deserialize, Serialize};

/// Current schema version of the state file
pub const STATE_SCHEMA_VERSION: u32 = 1;

/// Record of a finished pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassRecord {
    /// 1-based pass number within this runner's lifetime
    pub pass: u64,
    pub outcome: PassOutcome,
    pub exit_code: i32,
    pub started_at: String,
    pub finished_at: String,
    pub duration_ms: u64,
}

/// Contents of the state file, rewritten after every pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerState {
    /// Schema version for future migrations
    pub schema_version: u32,

    /// Identifies one runner process
    pub run_id: String,

    /// Integration (or CLI subcommand) being run
    pub integration: String,

    pub passes_completed: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_pass: Option<PassRecord>,

    /// When the state was last written
    pub updated_at: String,
}

impl RunnerState {
    pub fn new(run_id: impl Into<String>, integration: impl Into<String>) -> Self {
        Self {
            schema_version: STATE_SCHEMA_VERSION,
            run_id: run_id.into(),
            integration: integration.into(),
            passes_completed: 0,
            last_pass: None,
            updated_at: crate::utils::now_iso(),
        }
    }

    /// Fold a finished pass into the state
    pub fn record(&mut self, record: PassRecord) {
        self.passes_completed = record.pass;
        self.updated_at = record.finished_at.clone();
        self.last_pass = Some(record);
    }
}
