// vigil-core/src/application/runner.rs

use futures::StreamExt;
use tokio::sync::OnceCell;
use tracing::{info, instrument, warn};

use crate::application::engine::{FetchFailure, QueryContext, fetch_metric};
use crate::domain::baseline::{BaselineSnapshot, ColumnDef, SchemaDiff};
use crate::domain::project::TableSpec;
use crate::domain::quality::{
    CheckDefinition, CheckKind, CheckResult, CheckTarget, Metric, Status, evaluate,
};

/// What the run saw of the table, kept for the next baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub row_count: u64,
    pub columns: Vec<ColumnDef>,
}

/// Output of one table's checks, before baseline handling.
#[derive(Debug, Clone)]
pub struct TableRun {
    pub table: String,
    pub source: String,
    pub checks: Vec<CheckResult>,
    /// `Some` only when both the schema and the row count were fetched.
    pub observed: Option<Observation>,
}

/// Table-level metrics shared by several checks.
struct Shared<'a> {
    schema: Result<Vec<ColumnDef>, FetchFailure>,
    row_count: Result<u64, FetchFailure>,
    total: OnceCell<Result<u64, FetchFailure>>,
    baseline: Option<&'a BaselineSnapshot>,
}

/// Executes every check of one table against its datasource.
pub struct CheckRunner {
    ctx: QueryContext,
    concurrency: usize,
}

impl CheckRunner {
    pub fn new(ctx: QueryContext, concurrency: usize) -> Self {
        Self {
            ctx,
            concurrency: concurrency.max(1),
        }
    }

    #[instrument(skip_all, fields(table = %spec.table, source = %spec.source))]
    pub async fn run(&self, spec: &TableSpec, baseline: Option<&BaselineSnapshot>) -> TableRun {
        info!("🔍 Checking table '{}'", spec.table);
        let ds = &self.ctx.datasource;
        let table = spec.table.as_str();

        let (schema, row_count) = futures::join!(
            fetch_metric(&self.ctx, "schema", || ds.schema(table)),
            fetch_metric(&self.ctx, "row_count", || ds.row_count(table)),
        );

        let shared = Shared {
            schema,
            row_count,
            total: OnceCell::new(),
            baseline,
        };

        let checks = spec.resolve_checks(shared.schema.as_ref().ok().map(Vec::as_slice));
        let results: Vec<CheckResult> = futures::stream::iter(
            checks.iter().map(|check| self.run_check(table, check, &shared)),
        )
        .buffered(self.concurrency)
        .collect()
        .await;

        let observed = match (&shared.schema, &shared.row_count) {
            (Ok(columns), Ok(row_count)) => Some(Observation {
                row_count: *row_count,
                columns: columns.clone(),
            }),
            _ => None,
        };

        let status = Status::worst(results.iter().map(|r| r.status));
        if self.ctx.is_down() {
            warn!("⛔ Table '{}' short-circuited: datasource unreachable", spec.table);
        }
        info!(
            status = %status,
            checks = results.len(),
            "🏁 Table '{}' finished",
            spec.table
        );

        TableRun {
            table: spec.table.clone(),
            source: spec.source.clone(),
            checks: results,
            observed,
        }
    }

    async fn run_check(&self, table: &str, check: &CheckDefinition, shared: &Shared<'_>) -> CheckResult {
        match self.measure(table, check, shared).await {
            Ok(metric) => {
                let evaluation = evaluate(check, &metric);
                CheckResult::from_evaluation(check, metric, evaluation)
            }
            Err(failure) => CheckResult::error(check, failure.into()),
        }
    }

    /// Gathers the metric a check is evaluated on.
    async fn measure(
        &self,
        table: &str,
        check: &CheckDefinition,
        shared: &Shared<'_>,
    ) -> Result<Metric, FetchFailure> {
        let ds = &self.ctx.datasource;

        // Column checks fail without a query when the column is known to be absent.
        if let (Some(column), Ok(schema)) = (check.target.column(), &shared.schema) {
            if !schema.iter().any(|c| c.name == column) {
                return Ok(Metric::ColumnMissing {
                    column: column.to_string(),
                });
            }
        }

        match (check.kind, &check.target) {
            (CheckKind::SchemaDrift, _) => {
                let current = shared.schema.clone()?;
                Ok(Metric::SchemaDiff {
                    diff: shared
                        .baseline
                        .map(|b| SchemaDiff::between(&b.columns, &current)),
                    current_columns: current.len(),
                })
            }

            (CheckKind::ColumnType, CheckTarget::Column(column)) => {
                let schema = shared.schema.as_ref().map_err(Clone::clone)?;
                match schema.iter().find(|c| &c.name == column) {
                    Some(found) => Ok(Metric::ColumnType {
                        actual: found.data_type.clone(),
                    }),
                    None => Ok(Metric::ColumnMissing {
                        column: column.clone(),
                    }),
                }
            }

            // Only resolved when "all columns" was asked for and the schema is unknown.
            (CheckKind::NullRate, CheckTarget::Table) => Err(shared.schema.clone().err().unwrap_or(
                FetchFailure::Query {
                    reason: "column list unavailable".into(),
                    attempts: 0,
                },
            )),

            (CheckKind::NullRate | CheckKind::RequiredColumns, CheckTarget::Column(column)) => {
                let total = self.total(table, shared).await?;
                let nulls = fetch_metric(&self.ctx, "null_count", || ds.null_count(table, column)).await?;
                Ok(Metric::NullCount { nulls, total })
            }

            (CheckKind::PkUniqueness, CheckTarget::Column(column)) => {
                let total = self.total(table, shared).await?;
                let distinct =
                    fetch_metric(&self.ctx, "distinct_count", || ds.distinct_count(table, column)).await?;
                Ok(Metric::DuplicateCount { total, distinct })
            }

            (CheckKind::RowCountBounds | CheckKind::RowCountChange, _) => {
                let current = shared.row_count.clone()?;
                Ok(Metric::RowCount {
                    current,
                    baseline: shared.baseline.map(|b| b.row_count),
                })
            }

            (kind, target) => Err(FetchFailure::Query {
                reason: format!("{kind} cannot target {target:?}"),
                attempts: 0,
            }),
        }
    }

    /// Total row count, fetched once per table on first use.
    async fn total(&self, table: &str, shared: &Shared<'_>) -> Result<u64, FetchFailure> {
        let ds = &self.ctx.datasource;
        shared
            .total
            .get_or_init(|| fetch_metric(&self.ctx, "total_count", || ds.total_count(table)))
            .await
            .clone()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::project::{RetryPolicy, RunSettings};
    use crate::domain::quality::FailureKind;
    use crate::ports::datasource::{Datasource, DatasourceError};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Semaphore;
    use tokio_util::sync::CancellationToken;

    #[derive(Default)]
    struct MockDatasource {
        rows: u64,
        columns: Vec<ColumnDef>,
        nulls: Vec<(&'static str, u64)>,
        distinct: u64,
        unreachable: bool,
        broken_column: Option<&'static str>,
        queries: AtomicUsize,
    }

    impl MockDatasource {
        fn check_up(&self) -> Result<(), DatasourceError> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            if self.unreachable {
                Err(DatasourceError::Connectivity("connection refused".into()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl Datasource for MockDatasource {
        fn name(&self) -> &str {
            "mock"
        }
        async fn row_count(&self, _table: &str) -> Result<u64, DatasourceError> {
            self.check_up()?;
            Ok(self.rows)
        }
        async fn null_count(&self, _table: &str, column: &str) -> Result<u64, DatasourceError> {
            self.check_up()?;
            if self.broken_column == Some(column) {
                return Err(DatasourceError::Query("permission denied".into()));
            }
            Ok(self
                .nulls
                .iter()
                .find(|(c, _)| *c == column)
                .map_or(0, |(_, n)| *n))
        }
        async fn total_count(&self, _table: &str) -> Result<u64, DatasourceError> {
            self.check_up()?;
            Ok(self.rows)
        }
        async fn distinct_count(&self, _table: &str, _column: &str) -> Result<u64, DatasourceError> {
            self.check_up()?;
            Ok(self.distinct)
        }
        async fn schema(&self, _table: &str) -> Result<Vec<ColumnDef>, DatasourceError> {
            self.check_up()?;
            Ok(self.columns.clone())
        }
    }

    fn orders_columns() -> Vec<ColumnDef> {
        vec![
            ColumnDef::new("order_id", "int"),
            ColumnDef::new("customer_id", "int"),
            ColumnDef::new("email", "string"),
        ]
    }

    fn runner(ds: Arc<MockDatasource>) -> CheckRunner {
        let settings = RunSettings {
            retry: RetryPolicy {
                max_attempts: 2,
                initial_backoff: Duration::from_millis(1),
                multiplier: 2.0,
                max_backoff: Duration::from_millis(2),
            },
            ..RunSettings::default()
        };
        let ctx = QueryContext::new(
            "orders",
            ds,
            Arc::new(Semaphore::new(4)),
            &settings,
            CancellationToken::new(),
        );
        CheckRunner::new(ctx, 4)
    }

    fn status_of<'a>(run: &'a TableRun, id: &str) -> Option<&'a CheckResult> {
        run.checks.iter().find(|c| c.id == id)
    }

    #[tokio::test]
    async fn test_clean_table_passes() -> anyhow::Result<()> {
        let ds = Arc::new(MockDatasource {
            rows: 100,
            distinct: 100,
            columns: orders_columns(),
            ..Default::default()
        });
        let spec = TableSpec::new("orders", "mock")
            .with_primary_key("order_id")
            .with_required_columns(["customer_id"]);

        let run = runner(ds).run(&spec, None).await;

        assert!(run.checks.iter().all(|c| c.status == Status::Pass));
        assert_eq!(
            run.observed,
            Some(Observation {
                row_count: 100,
                columns: orders_columns()
            })
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_query_error_isolated_to_its_check() -> anyhow::Result<()> {
        let ds = Arc::new(MockDatasource {
            rows: 100,
            distinct: 100,
            columns: orders_columns(),
            nulls: vec![("email", 30)],
            broken_column: Some("customer_id"),
            ..Default::default()
        });
        let spec = TableSpec::new("orders", "mock").with_null_rate_columns(["customer_id", "email"]);

        let run = runner(ds).run(&spec, None).await;

        let broken = status_of(&run, "null_rate:customer_id").unwrap();
        assert_eq!(broken.status, Status::Error);
        assert_eq!(broken.failure.as_ref().unwrap().kind, FailureKind::Query);

        let email = status_of(&run, "null_rate:email").unwrap();
        assert_eq!(email.status, Status::Fail);
        Ok(())
    }

    #[tokio::test]
    async fn test_unreachable_datasource_short_circuits_table() -> anyhow::Result<()> {
        let ds = Arc::new(MockDatasource {
            unreachable: true,
            ..Default::default()
        });
        let spec = TableSpec::new("orders", "mock")
            .with_primary_key("order_id")
            .with_required_columns(["customer_id"]);

        let run = runner(ds.clone()).run(&spec, None).await;

        assert!(!run.checks.is_empty());
        assert!(run.checks.iter().all(|c| c.is_connectivity_error()));
        assert!(run.observed.is_none());
        // schema and row_count at most; nothing after the table went down
        assert!(ds.queries.load(Ordering::SeqCst) <= 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_column_fails_without_query() -> anyhow::Result<()> {
        let ds = Arc::new(MockDatasource {
            rows: 10,
            distinct: 10,
            columns: orders_columns(),
            ..Default::default()
        });
        let spec = TableSpec::new("orders", "mock").with_required_columns(["shipped_at"]);

        let run = runner(ds).run(&spec, None).await;

        let missing = status_of(&run, "required_columns:shipped_at").unwrap();
        assert_eq!(missing.status, Status::Fail);
        assert!(missing.message.contains("does not exist"));
        Ok(())
    }

    #[tokio::test]
    async fn test_drift_against_baseline() -> anyhow::Result<()> {
        let ds = Arc::new(MockDatasource {
            rows: 500,
            columns: vec![
                ColumnDef::new("a", "int"),
                ColumnDef::new("c", "int"),
                ColumnDef::new("d", "int"),
            ],
            ..Default::default()
        });
        let baseline = BaselineSnapshot::capture(
            "orders",
            1000,
            vec![
                ColumnDef::new("a", "int"),
                ColumnDef::new("b", "int"),
                ColumnDef::new("c", "int"),
            ],
            None,
        );
        let spec = TableSpec::new("orders", "mock");

        let run = runner(ds).run(&spec, Some(&baseline)).await;

        assert_eq!(status_of(&run, "schema_drift").unwrap().status, Status::Fail);
        assert_eq!(status_of(&run, "row_count_change").unwrap().status, Status::Fail);
        Ok(())
    }

    #[tokio::test]
    async fn test_checks_keep_resolution_order() -> anyhow::Result<()> {
        let ds = Arc::new(MockDatasource {
            rows: 10,
            distinct: 10,
            columns: orders_columns(),
            ..Default::default()
        });
        let spec = TableSpec::new("orders", "mock")
            .with_primary_key("order_id")
            .with_null_rate_columns(["email"]);

        let run = runner(ds).run(&spec, None).await;
        let ids: Vec<&str> = run.checks.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "schema_drift",
                "null_rate:email",
                "pk_uniqueness:order_id",
                "row_count_change"
            ]
        );
        Ok(())
    }
}
