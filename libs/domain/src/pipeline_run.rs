//! Workflow run entity: one row per `run_workflow` invocation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::RunId;

/// Status of a workflow run, as persisted in `workflow_runs.status`.
///
/// Transitions are monotonic: a run never moves backward (e.g. from
/// `Completed` to `Running`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowRunStatus {
    Pending,
    Running,
    Completed,
    CompletedWithErrors,
    Failed,
    Canceled,
}

impl WorkflowRunStatus {
    /// A status a run can no longer transition away from.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::CompletedWithErrors | Self::Failed | Self::Canceled
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: RunId,
    pub pipeline_name: String,
    pub inputs: serde_json::Value,
    pub no_cache: bool,
    pub status: WorkflowRunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(WorkflowRunStatus::Completed.is_terminal());
        assert!(WorkflowRunStatus::Failed.is_terminal());
        assert!(WorkflowRunStatus::CompletedWithErrors.is_terminal());
        assert!(WorkflowRunStatus::Canceled.is_terminal());
        assert!(!WorkflowRunStatus::Pending.is_terminal());
        assert!(!WorkflowRunStatus::Running.is_terminal());
    }
}
