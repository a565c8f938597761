// vigil-core/tests/engine_scenarios.rs
//
// End-to-end runs of the orchestrator against a scripted datasource.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;

use vigil_core::application::Orchestrator;
use vigil_core::domain::baseline::ColumnDef;
use vigil_core::domain::project::{BaselinePolicy, RetryPolicy, RunSettings, TableSpec};
use vigil_core::domain::quality::{BaselineOutcome, CheckResult, FailureKind, RunResult, Status};
use vigil_core::infrastructure::{JsonBaselineStore, MemoryBaselineStore};
use vigil_core::ports::baseline::BaselineStore;
use vigil_core::ports::datasource::{Datasource, DatasourceError, DatasourceRegistry};

#[derive(Debug, Clone, Default)]
struct TableData {
    rows: u64,
    columns: Vec<ColumnDef>,
    nulls: HashMap<String, u64>,
    distinct: HashMap<String, u64>,
}

impl TableData {
    fn new(rows: u64, columns: &[&str]) -> Self {
        Self {
            rows,
            columns: columns.iter().map(|c| ColumnDef::new(*c, "int")).collect(),
            ..Self::default()
        }
    }

    fn with_nulls(mut self, column: &str, nulls: u64) -> Self {
        self.nulls.insert(column.to_string(), nulls);
        self
    }

    fn with_distinct(mut self, column: &str, distinct: u64) -> Self {
        self.distinct.insert(column.to_string(), distinct);
        self
    }
}

/// In-memory warehouse whose content tests rewrite between runs.
#[derive(Default)]
struct Scripted {
    tables: Mutex<HashMap<String, TableData>>,
    unreachable: AtomicBool,
    latency: Option<Duration>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl Scripted {
    fn set(&self, table: &str, data: TableData) {
        self.tables.lock().unwrap().insert(table.to_string(), data);
    }

    async fn get(&self, table: &str) -> Result<TableData, DatasourceError> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(DatasourceError::Connectivity("connection refused".into()));
        }
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .ok_or_else(|| DatasourceError::Query(format!("table '{table}' not found")))
    }
}

#[async_trait]
impl Datasource for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn row_count(&self, table: &str) -> Result<u64, DatasourceError> {
        Ok(self.get(table).await?.rows)
    }

    async fn null_count(&self, table: &str, column: &str) -> Result<u64, DatasourceError> {
        Ok(self.get(table).await?.nulls.get(column).copied().unwrap_or(0))
    }

    async fn total_count(&self, table: &str) -> Result<u64, DatasourceError> {
        self.row_count(table).await
    }

    async fn distinct_count(&self, table: &str, column: &str) -> Result<u64, DatasourceError> {
        let data = self.get(table).await?;
        Ok(data.distinct.get(column).copied().unwrap_or(data.rows))
    }

    async fn schema(&self, table: &str) -> Result<Vec<ColumnDef>, DatasourceError> {
        Ok(self.get(table).await?.columns)
    }
}

fn fast_settings() -> RunSettings {
    RunSettings {
        retry: RetryPolicy::none(),
        ..RunSettings::default()
    }
}

fn orchestrator(
    sources: Vec<(&str, Arc<Scripted>)>,
    store: Arc<dyn BaselineStore>,
    settings: RunSettings,
) -> Orchestrator {
    let mut registry = DatasourceRegistry::new();
    for (name, ds) in sources {
        registry.insert(name.to_string(), ds as Arc<dyn Datasource>);
    }
    Orchestrator::new(registry, store, settings)
}

fn check<'a>(result: &'a RunResult, table: &str, id: &str) -> &'a CheckResult {
    result
        .table(table)
        .and_then(|t| t.checks.iter().find(|c| c.id == id))
        .unwrap_or_else(|| panic!("no check '{id}' on '{table}'"))
}

fn statuses(result: &RunResult) -> Vec<(String, String, Status, String)> {
    result
        .tables
        .iter()
        .flat_map(|t| {
            t.checks
                .iter()
                .map(|c| (t.table.clone(), c.id.clone(), c.status, c.message.clone()))
        })
        .collect()
}

#[tokio::test]
async fn test_unchanged_data_gives_identical_results() -> Result<()> {
    let ds = Arc::new(Scripted::default());
    ds.set("orders", TableData::new(100, &["id", "email"]).with_nulls("email", 3));
    let store = Arc::new(MemoryBaselineStore::default());
    let specs = vec![TableSpec::new("orders", "warehouse").with_primary_key("id")];
    let engine = orchestrator(vec![("warehouse", ds)], store.clone(), fast_settings());

    let first = engine.run(&specs).await?;
    let second = engine.run(&specs).await?;
    let third = engine.run(&specs).await?;

    assert_eq!(first.exit_code(), 0);
    assert!(
        check(&first, "orders", "row_count_change")
            .message
            .contains("No prior baseline")
    );
    assert_eq!(statuses(&second), statuses(&third));
    assert_eq!(second.exit_code(), third.exit_code());
    assert_eq!(store.load("orders")?.unwrap().run_count, 3);
    Ok(())
}

#[tokio::test]
async fn test_schema_drift_reports_removed_and_added_columns() -> Result<()> {
    let ds = Arc::new(Scripted::default());
    ds.set("orders", TableData::new(10, &["a", "b", "c"]));
    let store = Arc::new(MemoryBaselineStore::default());
    let specs = vec![TableSpec::new("orders", "warehouse")];
    let engine = orchestrator(vec![("warehouse", ds.clone())], store, fast_settings());

    engine.run(&specs).await?;
    ds.set("orders", TableData::new(10, &["a", "c", "d"]));
    let result = engine.run(&specs).await?;

    let drift = check(&result, "orders", "schema_drift");
    assert_eq!(drift.status, Status::Fail);
    assert!(drift.message.contains("column removed: b"));
    assert!(drift.message.contains("column added: d"));
    assert_eq!(result.exit_code(), 2);
    Ok(())
}

#[tokio::test]
async fn test_added_column_alone_only_warns() -> Result<()> {
    let ds = Arc::new(Scripted::default());
    ds.set("orders", TableData::new(10, &["a"]));
    let store = Arc::new(MemoryBaselineStore::default());
    let specs = vec![TableSpec::new("orders", "warehouse")];
    let engine = orchestrator(vec![("warehouse", ds.clone())], store, fast_settings());

    engine.run(&specs).await?;
    ds.set("orders", TableData::new(10, &["a", "b"]));
    let result = engine.run(&specs).await?;

    assert_eq!(check(&result, "orders", "schema_drift").status, Status::Warn);
    assert_eq!(result.exit_code(), 1);
    Ok(())
}

#[tokio::test]
async fn test_duplicate_primary_key_fails() -> Result<()> {
    let ds = Arc::new(Scripted::default());
    ds.set("orders", TableData::new(5, &["id"]).with_distinct("id", 4));
    let store = Arc::new(MemoryBaselineStore::default());
    let specs = vec![TableSpec::new("orders", "warehouse").with_primary_key("id")];

    let result = orchestrator(vec![("warehouse", ds)], store, fast_settings())
        .run(&specs)
        .await?;

    let pk = check(&result, "orders", "pk_uniqueness:id");
    assert_eq!(pk.status, Status::Fail);
    assert!(pk.message.contains("1 duplicate"));
    assert!(pk.hint.is_some());
    assert_eq!(result.exit_code(), 2);
    Ok(())
}

#[tokio::test]
async fn test_row_count_drop_fails_against_baseline() -> Result<()> {
    let ds = Arc::new(Scripted::default());
    ds.set("orders", TableData::new(1000, &["id"]));
    let store = Arc::new(MemoryBaselineStore::default());
    let specs = vec![TableSpec::new("orders", "warehouse")];
    let engine = orchestrator(vec![("warehouse", ds.clone())], store, fast_settings());

    engine.run(&specs).await?;
    ds.set("orders", TableData::new(500, &["id"]));
    let result = engine.run(&specs).await?;

    let change = check(&result, "orders", "row_count_change");
    assert_eq!(change.status, Status::Fail);
    assert!(change.message.contains("dropped"));
    Ok(())
}

#[tokio::test]
async fn test_unreachable_source_wins_over_failures() -> Result<()> {
    let healthy = Arc::new(Scripted::default());
    healthy.set("orders", TableData::new(5, &["id"]).with_distinct("id", 3));
    let down = Arc::new(Scripted::default());
    down.unreachable.store(true, Ordering::SeqCst);

    let store = Arc::new(MemoryBaselineStore::default());
    let specs = vec![
        TableSpec::new("orders", "warehouse").with_primary_key("id"),
        TableSpec::new("events", "lake").with_required_columns(["ts"]),
    ];

    let result = orchestrator(
        vec![("warehouse", healthy), ("lake", down)],
        store.clone(),
        fast_settings(),
    )
    .run(&specs)
    .await?;

    assert_eq!(result.table("orders").unwrap().status, Status::Fail);
    let events = result.table("events").unwrap();
    assert_eq!(events.status, Status::Error);
    assert!(events.has_connectivity_error());
    assert!(events.checks.iter().all(|c| c.status == Status::Error));
    assert_eq!(result.exit_code(), 3);

    // Nothing observed, nothing written.
    assert!(matches!(events.baseline, BaselineOutcome::Skipped(_)));
    assert!(store.load("events")?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_missing_table_is_isolated_error() -> Result<()> {
    let ds = Arc::new(Scripted::default());
    ds.set("orders", TableData::new(10, &["id"]));
    let store = Arc::new(MemoryBaselineStore::default());
    let specs = vec![
        TableSpec::new("orders", "warehouse"),
        TableSpec::new("ghost", "warehouse"),
    ];

    let result = orchestrator(vec![("warehouse", ds)], store, fast_settings())
        .run(&specs)
        .await?;

    assert_eq!(result.table("orders").unwrap().status, Status::Pass);
    let ghost = result.table("ghost").unwrap();
    assert_eq!(ghost.status, Status::Error);
    assert!(!ghost.has_connectivity_error());
    assert_eq!(result.exit_code(), 3);
    Ok(())
}

#[tokio::test]
async fn test_skip_on_failure_keeps_previous_baseline() -> Result<()> {
    let ds = Arc::new(Scripted::default());
    ds.set("orders", TableData::new(100, &["id"]));
    let store = Arc::new(MemoryBaselineStore::default());
    let specs = vec![TableSpec::new("orders", "warehouse")];
    let settings = RunSettings {
        baseline_policy: BaselinePolicy::SkipOnFailure,
        ..fast_settings()
    };
    let engine = orchestrator(vec![("warehouse", ds.clone())], store.clone(), settings);

    engine.run(&specs).await?;
    ds.set("orders", TableData::new(10, &["id"]));
    let result = engine.run(&specs).await?;

    assert_eq!(result.exit_code(), 2);
    assert!(matches!(
        result.table("orders").unwrap().baseline,
        BaselineOutcome::Skipped(_)
    ));
    let kept = store.load("orders")?.unwrap();
    assert_eq!(kept.row_count, 100);
    assert_eq!(kept.run_count, 1);
    Ok(())
}

#[tokio::test]
async fn test_never_policy_writes_nothing() -> Result<()> {
    let ds = Arc::new(Scripted::default());
    ds.set("orders", TableData::new(100, &["id"]));
    let store = Arc::new(MemoryBaselineStore::default());
    let settings = RunSettings {
        baseline_policy: BaselinePolicy::Never,
        ..fast_settings()
    };

    let result = orchestrator(vec![("warehouse", ds)], store.clone(), settings)
        .run(&[TableSpec::new("orders", "warehouse")])
        .await?;

    assert_eq!(result.exit_code(), 0);
    assert!(store.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_queries_per_datasource_stay_within_limit() -> Result<()> {
    let ds = Arc::new(Scripted {
        latency: Some(Duration::from_millis(5)),
        ..Scripted::default()
    });
    let tables = ["orders", "users", "events", "payments"];
    for table in tables {
        ds.set(table, TableData::new(100, &["id", "a", "b", "c"]));
    }
    let store = Arc::new(MemoryBaselineStore::default());
    let settings = RunSettings {
        max_concurrent_queries: 2,
        max_concurrent_tables: 4,
        ..fast_settings()
    };
    let specs: Vec<TableSpec> = tables
        .iter()
        .map(|t| {
            TableSpec::new(*t, "warehouse")
                .with_primary_key("id")
                .with_required_columns(["a", "b"])
        })
        .collect();

    let result = orchestrator(vec![("warehouse", ds.clone())], store, settings)
        .run(&specs)
        .await?;

    assert_eq!(result.exit_code(), 0);
    assert_eq!(result.totals.tables, 4);
    let peak = ds.peak_in_flight.load(Ordering::SeqCst);
    assert!(peak <= 2, "{peak} queries ran at once on one datasource");
    assert!(peak >= 1);
    Ok(())
}

#[tokio::test]
async fn test_run_timeout_cancels_with_complete_result() -> Result<()> {
    let ds = Arc::new(Scripted {
        latency: Some(Duration::from_secs(10)),
        ..Scripted::default()
    });
    ds.set("orders", TableData::new(10, &["id"]));
    let store = Arc::new(MemoryBaselineStore::default());
    let settings = RunSettings {
        run_timeout: Some(Duration::from_millis(50)),
        ..fast_settings()
    };
    let specs = vec![TableSpec::new("orders", "warehouse").with_primary_key("id")];

    let start = Instant::now();
    let result = orchestrator(vec![("warehouse", ds)], store.clone(), settings)
        .run(&specs)
        .await?;

    assert!(start.elapsed() < Duration::from_secs(5));
    let orders = result.table("orders").unwrap();
    assert!(!orders.checks.is_empty());
    assert!(orders.checks.iter().all(|c| {
        c.status == Status::Error
            && c.failure.as_ref().map(|f| f.kind) == Some(FailureKind::Cancelled)
    }));
    assert_eq!(result.exit_code(), 3);
    assert!(store.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_corrupted_baseline_file_is_treated_as_absent() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store = Arc::new(JsonBaselineStore::new(dir.path()));
    std::fs::write(store.path_for("orders"), "{ not json")?;

    let ds = Arc::new(Scripted::default());
    ds.set("orders", TableData::new(10, &["id"]));
    let result = orchestrator(vec![("warehouse", ds)], store.clone(), fast_settings())
        .run(&[TableSpec::new("orders", "warehouse")])
        .await?;

    assert_eq!(result.exit_code(), 0);
    assert!(
        check(&result, "orders", "row_count_change")
            .message
            .contains("No prior baseline")
    );
    assert_eq!(result.table("orders").unwrap().baseline, BaselineOutcome::Written);
    assert_eq!(store.load("orders")?.unwrap().row_count, 10);
    Ok(())
}

#[tokio::test]
async fn test_dotted_and_underscored_tables_keep_their_own_baselines() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store = Arc::new(JsonBaselineStore::new(dir.path()));
    let ds = Arc::new(Scripted::default());
    ds.set("sales.orders", TableData::new(1000, &["id"]));
    ds.set("sales_orders", TableData::new(1000, &["id"]));
    let specs = vec![
        TableSpec::new("sales.orders", "warehouse"),
        TableSpec::new("sales_orders", "warehouse"),
    ];
    let engine = orchestrator(vec![("warehouse", ds.clone())], store.clone(), fast_settings());

    engine.run(&specs).await?;
    ds.set("sales.orders", TableData::new(400, &["id"]));
    let result = engine.run(&specs).await?;

    let dotted = check(&result, "sales.orders", "row_count_change");
    assert_eq!(dotted.status, Status::Fail);
    assert!(dotted.message.contains("1000 -> 400"));
    assert_eq!(check(&result, "sales_orders", "row_count_change").status, Status::Pass);
    assert_eq!(store.load("sales.orders")?.unwrap().run_count, 2);
    assert_eq!(store.load("sales_orders")?.unwrap().run_count, 2);
    Ok(())
}
