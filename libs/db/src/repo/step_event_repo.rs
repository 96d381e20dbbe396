//! Postgres-backed repository for `step_events`: append-only progress events.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kurt_domain::{RunId, StepEvent, StepEventId, StepEventKind, StepLogId};
use sqlx::PgPool;

use crate::repo::errors::StepEventError;

#[async_trait]
pub trait StepEventRepository: Send + Sync {
    async fn append(&self, event: &NewStepEvent) -> Result<(), StepEventError>;

    async fn append_batch(&self, events: &[NewStepEvent]) -> Result<(), StepEventError>;

    /// Events for `run_id` in occurrence order, optionally resuming after
    /// `since_id` — the pull-based equivalent of a push progress channel
    /// (callers poll this rather than subscribing to a stream).
    async fn list_for_run(
        &self,
        run_id: &RunId,
        since_id: Option<StepEventId>,
    ) -> Result<Vec<StepEvent>, StepEventError>;
}

#[derive(Debug, Clone)]
pub struct NewStepEvent {
    pub run_id: RunId,
    pub step_log_id: StepLogId,
    pub kind: StepEventKind,
    pub detail: serde_json::Value,
}

fn kind_str(kind: StepEventKind) -> &'static str {
    match kind {
        StepEventKind::Started => "started",
        StepEventKind::ItemCompleted => "item_completed",
        StepEventKind::ItemSkipped => "item_skipped",
        StepEventKind::ItemFailed => "item_failed",
        StepEventKind::Progress => "progress",
        StepEventKind::Completed => "completed",
        StepEventKind::Failed => "failed",
        StepEventKind::Canceled => "canceled",
    }
}

pub struct PgStepEventRepository {
    pool: PgPool,
}

impl PgStepEventRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct StepEventRow {
    id: String,
    run_id: String,
    step_log_id: String,
    kind: String,
    detail: serde_json::Value,
    occurred_at: DateTime<Utc>,
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

fn parse_kind(s: &str) -> Result<StepEventKind, sqlx::Error> {
    match s {
        "started" => Ok(StepEventKind::Started),
        "item_completed" => Ok(StepEventKind::ItemCompleted),
        "item_skipped" => Ok(StepEventKind::ItemSkipped),
        "item_failed" => Ok(StepEventKind::ItemFailed),
        "progress" => Ok(StepEventKind::Progress),
        "completed" => Ok(StepEventKind::Completed),
        "failed" => Ok(StepEventKind::Failed),
        "canceled" => Ok(StepEventKind::Canceled),
        other => Err(decode_err(format!("unknown step event kind: {other}"))),
    }
}

impl TryFrom<StepEventRow> for StepEvent {
    type Error = sqlx::Error;

    fn try_from(row: StepEventRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id.parse().map_err(decode_err)?,
            run_id: row.run_id.parse().map_err(decode_err)?,
            step_log_id: row.step_log_id.parse().map_err(decode_err)?,
            kind: parse_kind(&row.kind)?,
            detail: row.detail,
            occurred_at: row.occurred_at,
        })
    }
}

#[async_trait]
impl StepEventRepository for PgStepEventRepository {
    async fn append(&self, event: &NewStepEvent) -> Result<(), StepEventError> {
        sqlx::query(
            r#"
            INSERT INTO step_events (id, run_id, step_log_id, kind, detail, occurred_at)
            VALUES ($1, $2, $3, $4, $5, now())
            "#,
        )
        .bind(StepEventId::new().to_string())
        .bind(event.run_id.to_string())
        .bind(event.step_log_id.to_string())
        .bind(kind_str(event.kind))
        .bind(&event.detail)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn append_batch(&self, events: &[NewStepEvent]) -> Result<(), StepEventError> {
        if events.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for event in events {
            sqlx::query(
                r#"
                INSERT INTO step_events (id, run_id, step_log_id, kind, detail, occurred_at)
                VALUES ($1, $2, $3, $4, $5, now())
                "#,
            )
            .bind(StepEventId::new().to_string())
            .bind(event.run_id.to_string())
            .bind(event.step_log_id.to_string())
            .bind(kind_str(event.kind))
            .bind(&event.detail)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn list_for_run(
        &self,
        run_id: &RunId,
        since_id: Option<StepEventId>,
    ) -> Result<Vec<StepEvent>, StepEventError> {
        let rows = match since_id {
            Some(since) => {
                sqlx::query_as::<_, StepEventRow>(
                    r#"
                    SELECT id, run_id, step_log_id, kind, detail, occurred_at
                    FROM step_events
                    WHERE run_id = $1 AND occurred_at > (
                        SELECT occurred_at FROM step_events WHERE id = $2
                    )
                    ORDER BY occurred_at ASC
                    "#,
                )
                .bind(run_id.to_string())
                .bind(since.to_string())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, StepEventRow>(
                    r#"
                    SELECT id, run_id, step_log_id, kind, detail, occurred_at
                    FROM step_events
                    WHERE run_id = $1
                    ORDER BY occurred_at ASC
                    "#,
                )
                .bind(run_id.to_string())
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter()
            .map(|r| r.try_into().map_err(StepEventError::Database))
            .collect()
    }
}
