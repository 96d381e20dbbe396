//! Step log entity: one row per model execution within a workflow run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{RunId, StepLogId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepLogStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Canceled,
    Skipped,
}

impl StepLogStatus {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Canceled | Self::Skipped
        )
    }

    /// Whether `self -> next` is a legal monotonic transition.
    ///
    /// Once a step log reaches a terminal status it absorbs: no further
    /// transition is legal, matching the append-only/monotonic invariant on
    /// `step_logs`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (Self::Pending, Self::Running | Self::Skipped | Self::Canceled) => true,
            (Self::Running, _) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepLog {
    pub id: StepLogId,
    pub run_id: RunId,
    pub model_name: String,
    pub status: StepLogStatus,
    pub rows_processed: i64,
    pub rows_skipped: i64,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_can_start_running() {
        assert!(StepLogStatus::Pending.can_transition_to(StepLogStatus::Running));
    }

    #[test]
    fn terminal_absorbs() {
        assert!(!StepLogStatus::Completed.can_transition_to(StepLogStatus::Running));
        assert!(!StepLogStatus::Failed.can_transition_to(StepLogStatus::Completed));
    }

    #[test]
    fn running_can_reach_any_terminal() {
        for next in [
            StepLogStatus::Completed,
            StepLogStatus::Failed,
            StepLogStatus::Canceled,
            StepLogStatus::Skipped,
        ] {
            assert!(StepLogStatus::Running.can_transition_to(next));
        }
    }
}
