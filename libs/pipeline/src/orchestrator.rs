//! Workflow Orchestrator: turns a target pipeline name plus inputs into a
//! durable workflow run. Owns the process-wide model/pipeline registries
//! and hands each run off to the Pipeline Runner, persisting run status
//! before and after so a crash mid-run always leaves a resumable record.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use kurt_domain::{StepLogStatus, WorkflowRun, WorkflowRunStatus};
use sqlx::PgPool;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use kurt_providers::registry::ProviderRegistry;

use crate::config::ConfigResolver;
use crate::model::{ModelRegistry, StepContext};
use crate::runner::{run_pipeline, Pipeline, RunError};
use crate::tracker::{EventTracker, TrackerError};

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("pipeline '{0}' is not registered")]
    UnknownPipeline(String),
    #[error(transparent)]
    Tracker(#[from] TrackerError),
    #[error(transparent)]
    Run(#[from] RunError),
}

/// Owns everything a `run_workflow` call needs beyond the per-run inputs:
/// the registered models, the named pipelines (ordered model lists) a
/// target can resolve to, and the ambient config/provider/tracker
/// singletons every step's [`StepContext`] is built from.
pub struct WorkflowOrchestrator {
    pool: PgPool,
    models: ModelRegistry,
    pipelines: HashMap<String, Pipeline>,
    config: Arc<ConfigResolver>,
    providers: Arc<ProviderRegistry>,
    tracker: Arc<dyn EventTracker>,
}

impl WorkflowOrchestrator {
    #[must_use]
    pub fn new(
        pool: PgPool,
        models: ModelRegistry,
        pipelines: HashMap<String, Pipeline>,
        config: Arc<ConfigResolver>,
        providers: Arc<ProviderRegistry>,
        tracker: Arc<dyn EventTracker>,
    ) -> Self {
        Self {
            pool,
            models,
            pipelines,
            config,
            providers,
            tracker,
        }
    }

    /// Start a brand-new run of `target`. The run record is created before
    /// a single model executes, so `get_live_status` can see it immediately
    /// and a crash before the first step still leaves a `pending`/`running`
    /// row behind rather than nothing at all.
    pub async fn run_workflow(
        &self,
        target: &str,
        inputs: serde_json::Value,
        no_cache: bool,
        cancel: CancellationToken,
    ) -> Result<WorkflowRun, OrchestratorError> {
        let pipeline = self.pipeline(target)?;
        let run = self.tracker.open_run(target, inputs, no_cache).await?;
        self.drive(pipeline, run, &HashSet::new(), cancel).await
    }

    /// Resume a run that was created (and possibly partially executed) by
    /// a prior `run_workflow`/`resume_workflow` call. Steps already
    /// `Completed` are skipped; execution picks back up at the first
    /// incomplete model in declaration order.
    pub async fn resume_workflow(
        &self,
        run: WorkflowRun,
        cancel: CancellationToken,
    ) -> Result<WorkflowRun, OrchestratorError> {
        let pipeline = self.pipeline(&run.pipeline_name)?;
        let already_completed = self
            .tracker
            .steps_for_run(&run.id)
            .await?
            .into_iter()
            .filter(|s| s.status == StepLogStatus::Completed)
            .map(|s| s.model_name)
            .collect();
        self.drive(pipeline, run, &already_completed, cancel).await
    }

    fn pipeline(&self, target: &str) -> Result<&Pipeline, OrchestratorError> {
        self.pipelines
            .get(target)
            .ok_or_else(|| OrchestratorError::UnknownPipeline(target.to_string()))
    }

    async fn drive(
        &self,
        pipeline: &Pipeline,
        run: WorkflowRun,
        already_completed: &HashSet<String>,
        cancel: CancellationToken,
    ) -> Result<WorkflowRun, OrchestratorError> {
        if cancel.is_cancelled() {
            let closed = self
                .tracker
                .close_run(&run.id, WorkflowRunStatus::Canceled, Some("canceled before start"))
                .await?;
            return Ok(closed);
        }

        let run_id = run.id;
        let pipeline_name = pipeline.name.clone();
        let no_cache = run.no_cache;
        let metadata = run.inputs.clone();
        let pool = self.pool.clone();
        let config = self.config.clone();
        let providers = self.providers.clone();
        let cancel_for_ctx = cancel.clone();

        let ctx_for = move |_model_name: &str| StepContext {
            pool: pool.clone(),
            run_id,
            pipeline_name: pipeline_name.clone(),
            no_cache,
            metadata: metadata.clone(),
            config: config.clone(),
            providers: providers.clone(),
            cancel: cancel_for_ctx.clone(),
        };

        let outcome = run_pipeline(
            &self.models,
            pipeline,
            ctx_for,
            self.tracker.as_ref(),
            &run_id,
            already_completed,
            &cancel,
        )
        .await;

        match outcome {
            Ok(summary) if summary.canceled => {
                let closed = self
                    .tracker
                    .close_run(&run.id, WorkflowRunStatus::Canceled, None)
                    .await?;
                Ok(closed)
            }
            Ok(summary) if summary.errors.is_empty() => {
                let closed = self
                    .tracker
                    .close_run(&run.id, WorkflowRunStatus::Completed, None)
                    .await?;
                Ok(closed)
            }
            Ok(summary) => {
                let detail = summary
                    .errors
                    .iter()
                    .map(|(model, message)| format!("{model}: {message}"))
                    .collect::<Vec<_>>()
                    .join("; ");
                let closed = self
                    .tracker
                    .close_run(&run.id, WorkflowRunStatus::CompletedWithErrors, Some(&detail))
                    .await?;
                Ok(closed)
            }
            Err(err) => {
                self.tracker
                    .close_run(&run.id, WorkflowRunStatus::Failed, Some(&err.to_string()))
                    .await?;
                Err(OrchestratorError::Run(err))
            }
        }
    }
}
