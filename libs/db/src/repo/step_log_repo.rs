//! Postgres-backed repository for `step_logs`: one row per model execution.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kurt_domain::{RunId, StepLog, StepLogId, StepLogStatus};
use sqlx::PgPool;

use crate::repo::errors::StepLogError;

#[async_trait]
pub trait StepLogRepository: Send + Sync {
    async fn start(&self, run_id: &RunId, model_name: &str) -> Result<StepLog, StepLogError>;

    async fn record_progress(
        &self,
        id: &StepLogId,
        rows_processed: i64,
        rows_skipped: i64,
    ) -> Result<(), StepLogError>;

    async fn complete(
        &self,
        id: &StepLogId,
        status: StepLogStatus,
        error: Option<&str>,
    ) -> Result<StepLog, StepLogError>;

    /// The status of every step log recorded so far for a run, in execution
    /// order. Used to resume a run at the first non-`completed` step.
    async fn list_for_run(&self, run_id: &RunId) -> Result<Vec<StepLog>, StepLogError>;
}

#[derive(Debug, sqlx::FromRow)]
struct StepLogRow {
    id: String,
    run_id: String,
    model_name: String,
    status: String,
    rows_processed: i64,
    rows_skipped: i64,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    error: Option<String>,
}

fn decode_err(msg: impl std::fmt::Display) -> sqlx::Error {
    #[derive(Debug)]
    struct E(String);
    impl std::fmt::Display for E {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.0)
        }
    }
    impl std::error::Error for E {}
    sqlx::Error::Decode(Box::new(E(msg.to_string())))
}

fn parse_status(s: &str) -> Result<StepLogStatus, sqlx::Error> {
    match s {
        "pending" => Ok(StepLogStatus::Pending),
        "running" => Ok(StepLogStatus::Running),
        "completed" => Ok(StepLogStatus::Completed),
        "failed" => Ok(StepLogStatus::Failed),
        "canceled" => Ok(StepLogStatus::Canceled),
        "skipped" => Ok(StepLogStatus::Skipped),
        other => Err(decode_err(format!("unknown step log status: {other}"))),
    }
}

fn status_str(status: StepLogStatus) -> &'static str {
    match status {
        StepLogStatus::Pending => "pending",
        StepLogStatus::Running => "running",
        StepLogStatus::Completed => "completed",
        StepLogStatus::Failed => "failed",
        StepLogStatus::Canceled => "canceled",
        StepLogStatus::Skipped => "skipped",
    }
}

impl TryFrom<StepLogRow> for StepLog {
    type Error = sqlx::Error;

    fn try_from(row: StepLogRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id.parse().map_err(decode_err)?,
            run_id: row.run_id.parse().map_err(decode_err)?,
            model_name: row.model_name,
            status: parse_status(&row.status)?,
            rows_processed: row.rows_processed,
            rows_skipped: row.rows_skipped,
            started_at: row.started_at,
            finished_at: row.finished_at,
            error: row.error,
        })
    }
}

pub struct PgStepLogRepository {
    pool: PgPool,
}

impl PgStepLogRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StepLogRepository for PgStepLogRepository {
    async fn start(&self, run_id: &RunId, model_name: &str) -> Result<StepLog, StepLogError> {
        let id = StepLogId::new();
        let row = sqlx::query_as::<_, StepLogRow>(
            r#"
            INSERT INTO step_logs (id, run_id, model_name, status, rows_processed, rows_skipped, started_at)
            VALUES ($1, $2, $3, 'running', 0, 0, now())
            RETURNING id, run_id, model_name, status, rows_processed, rows_skipped, started_at, finished_at, error
            "#,
        )
        .bind(id.to_string())
        .bind(run_id.to_string())
        .bind(model_name)
        .fetch_one(&self.pool)
        .await
        .map_err(StepLogError::Database)?;

        row.try_into().map_err(StepLogError::Database)
    }

    async fn record_progress(
        &self,
        id: &StepLogId,
        rows_processed: i64,
        rows_skipped: i64,
    ) -> Result<(), StepLogError> {
        sqlx::query(
            r#"
            UPDATE step_logs
            SET rows_processed = rows_processed + $2, rows_skipped = rows_skipped + $3
            WHERE id = $1
            "#,
        )
        .bind(id.to_string())
        .bind(rows_processed)
        .bind(rows_skipped)
        .execute(&self.pool)
        .await
        .map_err(StepLogError::Database)?;
        Ok(())
    }

    async fn complete(
        &self,
        id: &StepLogId,
        status: StepLogStatus,
        error: Option<&str>,
    ) -> Result<StepLog, StepLogError> {
        let row = sqlx::query_as::<_, StepLogRow>(
            r#"
            SELECT id, run_id, model_name, status, rows_processed, rows_skipped, started_at, finished_at, error
            FROM step_logs WHERE id = $1
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(StepLogError::Database)?
        .ok_or(StepLogError::NotFound(*id))?;

        let current: StepLog = row.try_into().map_err(StepLogError::Database)?;
        if !current.status.can_transition_to(status) {
            return Err(StepLogError::IllegalTransition {
                from: current.status,
                to: status,
            });
        }

        let row = sqlx::query_as::<_, StepLogRow>(
            r#"
            UPDATE step_logs
            SET status = $2, error = $3, finished_at = now()
            WHERE id = $1
            RETURNING id, run_id, model_name, status, rows_processed, rows_skipped, started_at, finished_at, error
            "#,
        )
        .bind(id.to_string())
        .bind(status_str(status))
        .bind(error)
        .fetch_one(&self.pool)
        .await
        .map_err(StepLogError::Database)?;

        row.try_into().map_err(StepLogError::Database)
    }

    async fn list_for_run(&self, run_id: &RunId) -> Result<Vec<StepLog>, StepLogError> {
        let rows = sqlx::query_as::<_, StepLogRow>(
            r#"
            SELECT id, run_id, model_name, status, rows_processed, rows_skipped, started_at, finished_at, error
            FROM step_logs WHERE run_id = $1 ORDER BY started_at ASC
            "#,
        )
        .bind(run_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(StepLogError::Database)?;

        rows.into_iter()
            .map(|r| r.try_into().map_err(StepLogError::Database))
            .collect()
    }
}
