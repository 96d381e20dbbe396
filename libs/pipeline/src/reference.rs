//! Reference & BoundReference: a model's typed handle onto another model's
//! output table, resolved against a `DocumentSelector` once per step.
//!
//! A model declares a `Reference<T>` field; the runner binds it before
//! invoking the model function and the bound value is the only way the
//! model code can read upstream rows. This keeps fetch-then-filter
//! ordering (SQL fetch, then [`crate::filter`]) out of model authors' hands.

use std::marker::PhantomData;

use async_trait::async_trait;
use kurt_domain::selector::DocumentSelector;
use kurt_domain::RunId;
use sqlx::PgPool;
use thiserror::Error;

use crate::filter::{self, Filterable};

#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("reference to table '{table}' not bound before use")]
    NotBound { table: String },
    #[error("database error resolving reference to '{table}': {source}")]
    Database {
        table: String,
        #[source]
        source: sqlx::Error,
    },
}

/// Whether a bound reference's rows are implicitly scoped to the current
/// pipeline context's workflow id (the default) or explicitly opted out
/// of that scoping, per the "rows from other workflows are never
/// visible... unless the caller explicitly opts out" invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkflowScope {
    #[default]
    CurrentRun,
    AllRuns,
}

/// Declares which table a step reads from and how rows decode, without
/// yet holding a connection or resolved rows. Model code holds this as a
/// struct field; the runner turns it into a `BoundReference<T>`.
pub struct Reference<T> {
    pub table: String,
    pub selector: DocumentSelector,
    pub scope: WorkflowScope,
    _marker: PhantomData<T>,
}

impl<T> Reference<T> {
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            selector: DocumentSelector::all(),
            scope: WorkflowScope::CurrentRun,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub fn with_selector(mut self, selector: DocumentSelector) -> Self {
        self.selector = selector;
        self
    }

    /// Opt out of the implicit current-workflow-id scope: rows from every
    /// workflow that ever wrote to this table become visible. Rare —
    /// cross-run comparisons are the only legitimate use.
    #[must_use]
    pub fn all_workflows(mut self) -> Self {
        self.scope = WorkflowScope::AllRuns;
        self
    }
}

/// Fetches the rows named by `table`, typically `SELECT * FROM table
/// WHERE workflow_id = $1 {and other SQL-expressible selector fields}`.
/// `run_id` is `None` only when the bound `Reference` opted out of
/// workflow scoping via [`Reference::all_workflows`]. Implemented per row
/// type so each model's expected schema stays typed.
#[async_trait]
pub trait FetchRows<T: Send>: Send + Sync {
    async fn fetch(
        &self,
        pool: &PgPool,
        run_id: Option<&RunId>,
        selector: &DocumentSelector,
    ) -> Result<Vec<T>, sqlx::Error>;
}

/// A `Reference<T>` resolved for the duration of one step: rows already
/// fetched (scoped to the current workflow id unless opted out) and
/// glob/limit/offset filtered.
pub struct BoundReference<T> {
    table: String,
    rows: Vec<T>,
}

impl<T: Filterable + Send> BoundReference<T> {
    pub async fn bind<F: FetchRows<T>>(
        reference: &Reference<T>,
        pool: &PgPool,
        run_id: &RunId,
        fetcher: &F,
    ) -> Result<Self, ReferenceError> {
        let scoped_run_id = match reference.scope {
            WorkflowScope::CurrentRun => Some(run_id),
            WorkflowScope::AllRuns => None,
        };
        let fetched = fetcher
            .fetch(pool, scoped_run_id, &reference.selector)
            .await
            .map_err(|source| ReferenceError::Database {
                table: reference.table.clone(),
                source,
            })?;
        let rows = filter::apply(&reference.selector, fetched);
        Ok(Self {
            table: reference.table.clone(),
            rows,
        })
    }

    #[must_use]
    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    #[must_use]
    pub fn into_rows(self) -> Vec<T> {
        self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Row {
        id: String,
        url: String,
    }

    impl Filterable for Row {
        fn id(&self) -> &str {
            &self.id
        }
        fn url(&self) -> &str {
            &self.url
        }
    }

    #[test]
    fn reference_defaults_to_unrestricted_selector() {
        let r: Reference<Row> = Reference::new("documents");
        assert!(!r.selector.has_post_fetch_filters());
        assert_eq!(r.scope, WorkflowScope::CurrentRun);
    }

    #[test]
    fn all_workflows_opts_out_of_scoping() {
        let r: Reference<Row> = Reference::new("documents").all_workflows();
        assert_eq!(r.scope, WorkflowScope::AllRuns);
    }

    /// An in-memory fetcher standing in for a real `sqlx` query, tagging
    /// each row with the workflow id it belongs to so the test can assert
    /// that a scoped bind only ever sees its own run's rows.
    struct MultiWorkflowFetcher {
        rows: Vec<(String, Row)>,
    }

    #[async_trait]
    impl FetchRows<Row> for MultiWorkflowFetcher {
        async fn fetch(
            &self,
            _pool: &PgPool,
            run_id: Option<&RunId>,
            _selector: &DocumentSelector,
        ) -> Result<Vec<Row>, sqlx::Error> {
            Ok(self
                .rows
                .iter()
                .filter(|(wf, _)| match run_id {
                    Some(r) => r.to_string() == *wf,
                    None => true,
                })
                .map(|(_, row)| Row {
                    id: row.id.clone(),
                    url: row.url.clone(),
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn bind_scopes_rows_to_the_current_workflow_id() {
        let run_a = RunId::new();
        let run_b = RunId::new();
        let fetcher = MultiWorkflowFetcher {
            rows: vec![
                (
                    run_a.to_string(),
                    Row {
                        id: "1".into(),
                        url: "https://a.com/1".into(),
                    },
                ),
                (
                    run_b.to_string(),
                    Row {
                        id: "2".into(),
                        url: "https://a.com/2".into(),
                    },
                ),
            ],
        };
        let pool = sqlx::PgPool::connect_lazy("postgres://localhost/does-not-matter").unwrap();
        let reference: Reference<Row> = Reference::new("documents");
        let bound = BoundReference::bind(&reference, &pool, &run_a, &fetcher)
            .await
            .unwrap();
        assert_eq!(bound.len(), 1);
        assert_eq!(bound.rows()[0].id, "1");
    }

    #[tokio::test]
    async fn all_workflows_bind_sees_every_run() {
        let run_a = RunId::new();
        let run_b = RunId::new();
        let fetcher = MultiWorkflowFetcher {
            rows: vec![
                (
                    run_a.to_string(),
                    Row {
                        id: "1".into(),
                        url: "https://a.com/1".into(),
                    },
                ),
                (
                    run_b.to_string(),
                    Row {
                        id: "2".into(),
                        url: "https://a.com/2".into(),
                    },
                ),
            ],
        };
        let pool = sqlx::PgPool::connect_lazy("postgres://localhost/does-not-matter").unwrap();
        let reference: Reference<Row> = Reference::new("documents").all_workflows();
        let bound = BoundReference::bind(&reference, &pool, &run_a, &fetcher)
            .await
            .unwrap();
        assert_eq!(bound.len(), 2);
    }

    #[test]
    fn bound_reference_exposes_row_count() {
        let bound = BoundReference {
            table: "documents".to_string(),
            rows: vec![
                Row {
                    id: "1".into(),
                    url: "https://a.com".into(),
                },
                Row {
                    id: "2".into(),
                    url: "https://b.com".into(),
                },
            ],
        };
        assert_eq!(bound.len(), 2);
        assert!(!bound.is_empty());
        assert_eq!(bound.table(), "documents");
    }
}
