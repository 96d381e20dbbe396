//! Pipeline Runner: executes one pipeline's declared models in order,
//! opening and closing a step log around each one and classifying model
//! failures into `skip_record` (record the error, keep going) versus
//! `fail_model` (abort the run).

use std::collections::HashSet;

use kurt_domain::{RunId, StepLogStatus};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::model::{ModelError, ModelRegistry, StepAction, StepContext};
use crate::tracker::{EventTracker, TrackerError};

/// Ordered list of model names executed for one pipeline invocation. Order
/// is declaration order, not inferred from data dependencies — a model
/// that reads another's output must be listed after it.
#[derive(Debug, Clone)]
pub struct Pipeline {
    pub name: String,
    pub models: Vec<String>,
}

impl Pipeline {
    #[must_use]
    pub fn new(name: impl Into<String>, models: Vec<String>) -> Self {
        Self {
            name: name.into(),
            models,
        }
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("model '{0}' is not registered")]
    UnknownModel(String),
    #[error(transparent)]
    Tracker(#[from] TrackerError),
    #[error("model '{model}' failed: {message}")]
    ModelFailed { model: String, message: String },
}

/// Outcome of running every model in a pipeline once.
#[derive(Debug, Default)]
pub struct PipelineSummary {
    pub models_executed: Vec<String>,
    pub models_skipped: Vec<String>,
    pub rows_written: u64,
    pub rows_skipped: u64,
    /// `(model_name, message)` for every `skip_record` the run absorbed.
    pub errors: Vec<(String, String)>,
    /// Set once `cancel` fires between models; no further models started.
    pub canceled: bool,
}

/// Run every model in `pipeline.models` in order.
///
/// `already_completed` holds model names whose step log is already
/// `Completed` from a prior attempt at this run id — a resumed run skips
/// them instead of re-executing. `ctx_for` builds the per-model
/// [`StepContext`] (it's a closure rather than one shared `StepContext` so
/// the orchestrator can stamp a fresh cancellation child-token or metadata
/// view per model if it ever needs to).
pub async fn run_pipeline(
    registry: &ModelRegistry,
    pipeline: &Pipeline,
    ctx_for: impl Fn(&str) -> StepContext,
    tracker: &dyn EventTracker,
    run_id: &RunId,
    already_completed: &HashSet<String>,
    cancel: &CancellationToken,
) -> Result<PipelineSummary, RunError> {
    let mut summary = PipelineSummary::default();

    for model_name in &pipeline.models {
        if cancel.is_cancelled() {
            summary.canceled = true;
            break;
        }

        if already_completed.contains(model_name) {
            summary.models_skipped.push(model_name.clone());
            continue;
        }

        let model = registry
            .get(model_name)
            .ok_or_else(|| RunError::UnknownModel(model_name.clone()))?;

        let step_log = tracker.open_step(run_id, model_name).await?;
        let ctx = ctx_for(model_name);

        match model.run(&ctx).await {
            Ok(result) => {
                tracker
                    .record_progress(
                        &step_log.id,
                        result.rows_written as i64,
                        result.rows_skipped as i64,
                    )
                    .await?;
                tracker
                    .close_step(run_id, &step_log.id, StepLogStatus::Completed, None)
                    .await?;
                summary.rows_written += result.rows_written;
                summary.rows_skipped += result.rows_skipped;
                summary.models_executed.push(model_name.clone());
            }
            Err(err) => {
                let message = err.to_string();
                match classify(&err) {
                    StepAction::SkipRecord => {
                        let skipped = err
                            .as_skip()
                            .map(|skip| skip.documents.len().max(1) as i64)
                            .unwrap_or(1);
                        tracker
                            .record_progress(&step_log.id, 0, skipped)
                            .await?;
                        tracker
                            .close_step(run_id, &step_log.id, StepLogStatus::Completed, Some(&message))
                            .await?;
                        summary.rows_skipped += skipped as u64;
                        summary.models_executed.push(model_name.clone());
                        summary.errors.push((model_name.clone(), message));
                    }
                    StepAction::FailModel => {
                        tracker
                            .close_step(run_id, &step_log.id, StepLogStatus::Failed, Some(&message))
                            .await?;
                        summary.errors.push((model_name.clone(), message.clone()));
                        return Err(RunError::ModelFailed {
                            model: model_name.clone(),
                            message,
                        });
                    }
                }
            }
        }
    }

    Ok(summary)
}

fn classify(err: &ModelError) -> StepAction {
    err.action()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_preserves_declared_order() {
        let p = Pipeline::new("indexing", vec!["a".into(), "b".into(), "c".into()]);
        assert_eq!(p.models, vec!["a", "b", "c"]);
    }
}
