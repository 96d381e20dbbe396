//! Postgres-backed repository for `workflow_runs`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kurt_domain::{RunId, WorkflowRun, WorkflowRunStatus};
use sqlx::PgPool;

use crate::repo::errors::{CreateRunError, FindRunError, UpdateRunError};

#[derive(Debug, Clone)]
pub struct NewRun {
    pub id: RunId,
    pub pipeline_name: String,
    pub inputs: serde_json::Value,
    pub no_cache: bool,
}

#[async_trait]
pub trait RunRepository: Send + Sync {
    async fn create(&self, run: &NewRun) -> Result<WorkflowRun, CreateRunError>;

    /// `id_or_prefix` may be a full `run_<uuid>` string or just a prefix of
    /// it, matching the `get_live_status` partial-id lookup contract.
    async fn find(&self, id_or_prefix: &str) -> Result<Option<WorkflowRun>, FindRunError>;

    async fn set_status(
        &self,
        id: &RunId,
        status: WorkflowRunStatus,
        error: Option<&str>,
    ) -> Result<WorkflowRun, UpdateRunError>;
}

#[derive(Debug, sqlx::FromRow)]
struct RunRow {
    id: String,
    pipeline_name: String,
    inputs: serde_json::Value,
    no_cache: bool,
    status: String,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    error: Option<String>,
}

impl TryFrom<RunRow> for WorkflowRun {
    type Error = sqlx::Error;

    fn try_from(row: RunRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row
                .id
                .parse()
                .map_err(|e| sqlx::Error::Decode(Box::new(DecodeErr(format!("{e}")))))?,
            pipeline_name: row.pipeline_name,
            inputs: row.inputs,
            no_cache: row.no_cache,
            status: parse_run_status(&row.status)?,
            started_at: row.started_at,
            finished_at: row.finished_at,
            error: row.error,
        })
    }
}

#[derive(Debug)]
struct DecodeErr(String);

impl std::fmt::Display for DecodeErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for DecodeErr {}

fn parse_run_status(s: &str) -> Result<WorkflowRunStatus, sqlx::Error> {
    match s {
        "pending" => Ok(WorkflowRunStatus::Pending),
        "running" => Ok(WorkflowRunStatus::Running),
        "completed" => Ok(WorkflowRunStatus::Completed),
        "completed_with_errors" => Ok(WorkflowRunStatus::CompletedWithErrors),
        "failed" => Ok(WorkflowRunStatus::Failed),
        "canceled" => Ok(WorkflowRunStatus::Canceled),
        other => Err(sqlx::Error::Decode(Box::new(DecodeErr(format!(
            "unknown workflow run status: {other}"
        ))))),
    }
}

fn status_str(status: WorkflowRunStatus) -> &'static str {
    match status {
        WorkflowRunStatus::Pending => "pending",
        WorkflowRunStatus::Running => "running",
        WorkflowRunStatus::Completed => "completed",
        WorkflowRunStatus::CompletedWithErrors => "completed_with_errors",
        WorkflowRunStatus::Failed => "failed",
        WorkflowRunStatus::Canceled => "canceled",
    }
}

pub struct PgRunRepository {
    pool: PgPool,
}

impl PgRunRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RunRepository for PgRunRepository {
    async fn create(&self, run: &NewRun) -> Result<WorkflowRun, CreateRunError> {
        let row = sqlx::query_as::<_, RunRow>(
            r#"
            INSERT INTO workflow_runs (id, pipeline_name, inputs, no_cache, status, started_at)
            VALUES ($1, $2, $3, $4, 'running', now())
            RETURNING id, pipeline_name, inputs, no_cache, status, started_at, finished_at, error
            "#,
        )
        .bind(run.id.to_string())
        .bind(&run.pipeline_name)
        .bind(&run.inputs)
        .bind(run.no_cache)
        .fetch_one(&self.pool)
        .await
        .map_err(CreateRunError::Database)?;

        row.try_into().map_err(CreateRunError::Database)
    }

    async fn find(&self, id_or_prefix: &str) -> Result<Option<WorkflowRun>, FindRunError> {
        let rows = sqlx::query_as::<_, RunRow>(
            r#"
            SELECT id, pipeline_name, inputs, no_cache, status, started_at, finished_at, error
            FROM workflow_runs
            WHERE id = $1 OR id LIKE $1 || '%'
            LIMIT 2
            "#,
        )
        .bind(id_or_prefix)
        .fetch_all(&self.pool)
        .await
        .map_err(FindRunError::Database)?;

        match rows.len() {
            0 => Ok(None),
            1 => {
                let run: WorkflowRun = rows
                    .into_iter()
                    .next()
                    .unwrap()
                    .try_into()
                    .map_err(FindRunError::Database)?;
                Ok(Some(run))
            }
            _ => Err(FindRunError::AmbiguousPrefix(id_or_prefix.to_string())),
        }
    }

    async fn set_status(
        &self,
        id: &RunId,
        status: WorkflowRunStatus,
        error: Option<&str>,
    ) -> Result<WorkflowRun, UpdateRunError> {
        let finished = status.is_terminal();
        let row = sqlx::query_as::<_, RunRow>(
            r#"
            UPDATE workflow_runs
            SET status = $2,
                error = $3,
                finished_at = CASE WHEN $4 THEN now() ELSE finished_at END
            WHERE id = $1
            RETURNING id, pipeline_name, inputs, no_cache, status, started_at, finished_at, error
            "#,
        )
        .bind(id.to_string())
        .bind(status_str(status))
        .bind(error)
        .bind(finished)
        .fetch_optional(&self.pool)
        .await
        .map_err(UpdateRunError::Database)?
        .ok_or_else(|| UpdateRunError::NotFound(*id))?;

        row.try_into().map_err(UpdateRunError::Database)
    }
}
