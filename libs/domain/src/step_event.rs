//! Step event entity: append-only, high-frequency progress events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{RunId, StepEventId, StepLogId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepEventKind {
    Started,
    ItemCompleted,
    ItemSkipped,
    ItemFailed,
    Progress,
    Completed,
    Failed,
    Canceled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepEvent {
    pub id: StepEventId,
    pub run_id: RunId,
    pub step_log_id: StepLogId,
    pub kind: StepEventKind,
    pub detail: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
}
