//! Model Registry & Output Contract: declarative registration of models
//! with their output schema's table/primary key and config type, plus the
//! `Model` trait the Pipeline Runner dispatches by name.
//!
//! A model's row type, config type, and exact wiring of `Reference`s are
//! internal to its `Model` implementation — the registry only needs the
//! bits the runner and writer machinery are structurally required to
//! enforce: the output table name and primary key for upserts, and an
//! async entry point that returns a row/error summary.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use kurt_db::repo::model_output::ModelOutputWriter;
use kurt_domain::RunId;
use kurt_providers::registry::ProviderRegistry;

use crate::config::ConfigResolver;
use crate::filter::Filterable;
use crate::reference::{BoundReference, FetchRows, Reference, ReferenceError};
use crate::writer::Writer;

/// The two ways a model's step can react to a failure mid-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepAction {
    /// Record the failure against one or more documents and keep going;
    /// the model completes with a non-zero `error_count`.
    SkipRecord,
    /// Abort this step and fail the whole workflow.
    FailModel,
}

/// Severity mirrors `action` one-to-one but is carried separately because
/// it is what gets surfaced to callers (the action is an internal
/// instruction to the runner).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Recoverable,
    Fatal,
}

impl StepAction {
    #[must_use]
    pub const fn severity(self) -> Severity {
        match self {
            Self::SkipRecord => Severity::Recoverable,
            Self::FailModel => Severity::Fatal,
        }
    }
}

/// A typed error a model function raises to hand control back to the
/// runner with an explicit instruction on how to treat it. Untyped panics
/// or `anyhow` errors bubbling out of a model are treated as
/// `action = fail_model` by the runner (see [`crate::runner`]).
#[derive(Debug, Clone, Error)]
#[error("{step}: {message}")]
pub struct WorkflowStepError {
    pub step: String,
    pub message: String,
    pub action: StepAction,
    /// Document ids the error pertains to, for surgical error reporting.
    pub documents: Vec<String>,
    pub metadata: Value,
    pub retryable: bool,
}

impl WorkflowStepError {
    #[must_use]
    pub fn skip_record(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            message: message.into(),
            action: StepAction::SkipRecord,
            documents: Vec::new(),
            metadata: Value::Null,
            retryable: false,
        }
    }

    #[must_use]
    pub fn fail_model(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            message: message.into(),
            action: StepAction::FailModel,
            documents: Vec::new(),
            metadata: Value::Null,
            retryable: false,
        }
    }

    #[must_use]
    pub fn with_documents(mut self, documents: Vec<String>) -> Self {
        self.documents = documents;
        self
    }

    #[must_use]
    pub const fn severity(&self) -> Severity {
        self.action.severity()
    }
}

/// Everything a model's `run` needs that isn't specific to its own row
/// types: the pool to build its own `Reference`/`Writer` instances from,
/// the run identity, the resolved document selector for this run, and
/// the ambient `no_cache` flag models must thread into `run_batch` calls.
#[derive(Clone)]
pub struct StepContext {
    pub pool: PgPool,
    pub run_id: RunId,
    pub pipeline_name: String,
    pub no_cache: bool,
    pub metadata: Value,
    pub config: Arc<ConfigResolver>,
    pub providers: Arc<ProviderRegistry>,
    /// Checked by a model's own `run_batch` calls; canceled from above when
    /// a run is aborted mid-flight.
    pub cancel: CancellationToken,
}

impl StepContext {
    /// `cache` flag to pass into `run_batch`/`BatchOptions`: the inverse of
    /// `no_cache`, per the cache-propagation contract.
    #[must_use]
    pub const fn cache(&self) -> bool {
        !self.no_cache
    }

    /// The only way model code obtains a `Writer`: construction stays
    /// internal to this crate (`Writer::for_model` is `pub(crate)`) so a
    /// model can never write without going through the run it was handed.
    #[must_use]
    pub fn writer_for<T: Serialize>(&self, table: impl Into<String>, primary_key: Vec<String>) -> Writer<T> {
        let table = table.into();
        let inner = ModelOutputWriter::new(self.pool.clone(), table.clone(), primary_key);
        Writer::for_model(inner, self.run_id, table)
    }

    /// Bind a declared `Reference<T>` for the duration of this step. Rows
    /// are scoped to `self.run_id` unless the reference opted out via
    /// `Reference::all_workflows` — this is the structural enforcement of
    /// "rows from other workflows are never visible."
    pub async fn bind_reference<T: Filterable + Send, F: FetchRows<T>>(
        &self,
        reference: &Reference<T>,
        fetcher: &F,
    ) -> Result<BoundReference<T>, ReferenceError> {
        BoundReference::bind(reference, &self.pool, &self.run_id, fetcher).await
    }
}

/// Summary returned by a model's `run`: how many output rows it wrote and
/// how many input records it had to skip via `WorkflowStepError::skip_record`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelRunSummary {
    pub rows_written: u64,
    pub rows_skipped: u64,
}

/// Error a model's `run` fails with. A bare `Other` (any error that isn't
/// a typed `WorkflowStepError`) is always fatal, per the "untyped
/// exceptions classify as fail_model" rule.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error(transparent)]
    Step(#[from] WorkflowStepError),
    #[error("model failed: {0}")]
    Other(#[from] anyhow::Error),
}

impl ModelError {
    #[must_use]
    pub fn action(&self) -> StepAction {
        match self {
            Self::Step(e) => e.action,
            Self::Other(_) => StepAction::FailModel,
        }
    }

    #[must_use]
    pub fn as_skip(&self) -> Option<&WorkflowStepError> {
        match self {
            Self::Step(e) if e.action == StepAction::SkipRecord => Some(e),
            _ => None,
        }
    }
}

/// A named unit of computation dispatched by the Pipeline Runner. Models
/// are pure w.r.t. their declared inputs: everything they read comes
/// through `ctx` and the `Reference`s they construct from it; everything
/// they write goes through the `Writer` they construct for their own
/// output table.
#[async_trait]
pub trait Model: Send + Sync {
    /// Dotted identifier, e.g. `indexing.section_extractions`.
    fn name(&self) -> &str;

    /// Output table name (`name` with `.` replaced by `_`).
    fn output_table(&self) -> String {
        self.name().replace('.', "_")
    }

    /// Field name(s) used for upsert conflict resolution.
    fn primary_key(&self) -> Vec<String>;

    /// Execute the model body for one workflow run.
    async fn run(&self, ctx: &StepContext) -> Result<ModelRunSummary, ModelError>;
}

/// Registry mapping model name to its registered implementation.
/// Duplicate registration overwrites, matching the dbt-style convention
/// that re-registering a model name replaces its prior definition.
#[derive(Default)]
pub struct ModelRegistry {
    models: HashMap<String, Arc<dyn Model>>,
}

impl ModelRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            models: HashMap::new(),
        }
    }

    pub fn register(&mut self, model: Arc<dyn Model>) {
        self.models.insert(model.name().to_string(), model);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Model>> {
        self.models.get(name).cloned()
    }

    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.models.keys().cloned().collect()
    }

    /// Test-only: drop every registration.
    pub fn clear(&mut self) {
        self.models.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop(&'static str);

    #[async_trait]
    impl Model for Noop {
        fn name(&self) -> &str {
            self.0
        }
        fn primary_key(&self) -> Vec<String> {
            vec!["document_id".to_string()]
        }
        async fn run(&self, _ctx: &StepContext) -> Result<ModelRunSummary, ModelError> {
            Ok(ModelRunSummary::default())
        }
    }

    #[test]
    fn output_table_replaces_dots_with_underscores() {
        let m = Noop("indexing.section_extractions");
        assert_eq!(m.output_table(), "indexing_section_extractions");
    }

    #[test]
    fn duplicate_registration_overwrites() {
        let mut reg = ModelRegistry::new();
        reg.register(Arc::new(Noop("a")));
        reg.register(Arc::new(Noop("a")));
        assert_eq!(reg.names().len(), 1);
    }

    #[test]
    fn clear_drops_all_registrations() {
        let mut reg = ModelRegistry::new();
        reg.register(Arc::new(Noop("a")));
        reg.clear();
        assert!(reg.get("a").is_none());
    }

    #[test]
    fn skip_record_is_recoverable_and_fail_model_is_fatal() {
        let skip = WorkflowStepError::skip_record("x", "bad doc");
        assert_eq!(skip.severity(), Severity::Recoverable);
        let fail = WorkflowStepError::fail_model("x", "boom");
        assert_eq!(fail.severity(), Severity::Fatal);
    }
}
