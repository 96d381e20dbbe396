//! Generic upsert sink for a registered model's output table.
//!
//! Every model's output row type maps 1:1 to a Postgres table
//! (`name.replace('.', "_")`). Rather than generate per-model SQL, rows are
//! serialized to JSON and upserted via `jsonb_populate_recordset`, matching
//! the column set already present on the target table.

use chrono::Utc;
use kurt_domain::RunId;
use sqlx::PgPool;

use crate::repo::errors::ModelWriteError;

pub struct ModelOutputWriter {
    pool: PgPool,
    table: String,
    primary_key: Vec<String>,
}

impl ModelOutputWriter {
    #[must_use]
    pub fn new(pool: PgPool, table: impl Into<String>, primary_key: Vec<String>) -> Self {
        Self {
            pool,
            table: table.into(),
            primary_key,
        }
    }

    /// Upsert a batch of rows. Every row must already carry `workflow_id`
    /// (stamped by the caller, never accepted from model code directly).
    pub async fn write_batch(
        &self,
        run_id: &RunId,
        rows: &[serde_json::Value],
    ) -> Result<u64, ModelWriteError> {
        if rows.is_empty() {
            return Err(ModelWriteError::EmptyBatch);
        }

        let now = serde_json::Value::String(Utc::now().to_rfc3339());
        let stamped: Vec<serde_json::Value> = rows
            .iter()
            .cloned()
            .map(|mut row| {
                if let serde_json::Value::Object(ref mut map) = row {
                    map.insert(
                        "workflow_id".to_string(),
                        serde_json::Value::String(run_id.to_string()),
                    );
                    map.entry("created_at").or_insert_with(|| now.clone());
                    map.insert("updated_at".to_string(), now.clone());
                }
                row
            })
            .collect();

        let conflict_cols = self.primary_key.join(", ");
        let update_cols: Vec<String> = Self::columns_of(&stamped[0])
            .into_iter()
            .filter(|c| !self.primary_key.contains(c))
            .map(|c| format!("{c} = EXCLUDED.{c}"))
            .collect();

        let sql = format!(
            r#"
            INSERT INTO {table}
            SELECT * FROM jsonb_populate_recordset(NULL::{table}, $1)
            ON CONFLICT ({conflict_cols}) DO UPDATE SET {update_set}
            "#,
            table = self.table,
            conflict_cols = conflict_cols,
            update_set = update_cols.join(", "),
        );

        let payload = serde_json::Value::Array(stamped.clone());
        let result = sqlx::query(&sql)
            .bind(payload)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    fn columns_of(row: &serde_json::Value) -> Vec<String> {
        match row {
            serde_json::Value::Object(map) => map.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_of_extracts_object_keys() {
        let row = serde_json::json!({"url": "https://x", "title": "t"});
        let mut cols = ModelOutputWriter::columns_of(&row);
        cols.sort();
        assert_eq!(cols, vec!["title".to_string(), "url".to_string()]);
    }
}
