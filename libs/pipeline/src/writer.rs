//! Writer: the only path model code has to persist rows, wrapping
//! `kurt_db::ModelOutputWriter` so upsert-only semantics and the
//! `workflow_id` stamp are structural rather than a convention model
//! authors have to remember.

use std::marker::PhantomData;

use kurt_db::repo::model_output::ModelOutputWriter;
use kurt_domain::RunId;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("writer for '{table}' received an empty batch")]
    EmptyBatch { table: String },
    #[error("database error writing to '{table}': {source}")]
    Database {
        table: String,
        #[source]
        source: kurt_db::repo::errors::ModelWriteError,
    },
    #[error("row serialization failed for '{table}': {source}")]
    Serialize {
        table: String,
        #[source]
        source: serde_json::Error,
    },
}

/// One writer per model per run, constructed only by the runner
/// (`Writer::for_model` is `pub(crate)`); model code receives an
/// already-built `&Writer<T>` and can only call `write`.
pub struct Writer<T> {
    inner: ModelOutputWriter,
    run_id: RunId,
    table: String,
    _marker: PhantomData<T>,
}

impl<T: Serialize> Writer<T> {
    pub(crate) fn for_model(
        inner: ModelOutputWriter,
        run_id: RunId,
        table: impl Into<String>,
    ) -> Self {
        Self {
            inner,
            run_id,
            table: table.into(),
            _marker: PhantomData,
        }
    }

    /// Upsert a batch of typed rows. `workflow_id` is stamped by the
    /// underlying writer; model code never sets it.
    pub async fn write(&self, rows: &[T]) -> Result<u64, WriteError> {
        if rows.is_empty() {
            return Err(WriteError::EmptyBatch {
                table: self.table.clone(),
            });
        }
        let values: Vec<serde_json::Value> = rows
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<_, _>>()
            .map_err(|source| WriteError::Serialize {
                table: self.table.clone(),
                source,
            })?;
        self.inner
            .write_batch(&self.run_id, &values)
            .await
            .map_err(|source| WriteError::Database {
                table: self.table.clone(),
                source,
            })
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Row {
        #[allow(dead_code)]
        url: String,
    }

    #[test]
    fn table_name_is_exposed_for_logging() {
        let pool = sqlx::PgPool::connect_lazy("postgres://localhost/does-not-matter").unwrap();
        let inner = ModelOutputWriter::new(pool, "documents", vec!["id".to_string()]);
        let writer: Writer<Row> = Writer::for_model(inner, RunId::new(), "documents");
        assert_eq!(writer.table(), "documents");
    }
}
