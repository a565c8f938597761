// vigil-core/src/application/orchestrator.rs

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::application::engine::QueryContext;
use crate::application::runner::{CheckRunner, TableRun};
use crate::domain::baseline::BaselineSnapshot;
use crate::domain::error::DomainError;
use crate::domain::project::{RunSettings, TableSpec};
use crate::domain::quality::{BaselineOutcome, RunResult, Status, TableResult};
use crate::error::VigilError;
use crate::ports::baseline::BaselineStore;
use crate::ports::datasource::{Datasource, DatasourceRegistry};

/// Drives one run: validation, baseline load, table checks, baseline write.
pub struct Orchestrator {
    datasources: DatasourceRegistry,
    store: Arc<dyn BaselineStore>,
    settings: RunSettings,
}

/// A table ready to run, with its resolved datasource.
struct Planned<'a> {
    spec: &'a TableSpec,
    datasource: Arc<dyn Datasource>,
    permits: Arc<Semaphore>,
}

impl Orchestrator {
    pub fn new(
        datasources: DatasourceRegistry,
        store: Arc<dyn BaselineStore>,
        settings: RunSettings,
    ) -> Self {
        Self {
            datasources,
            store,
            settings,
        }
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Configuration checks done before any query is issued.
    pub fn validate(&self, specs: &[TableSpec]) -> Result<(), VigilError> {
        self.plan(specs).map(|_| ())
    }

    fn plan<'a>(&self, specs: &'a [TableSpec]) -> Result<Vec<Planned<'a>>, VigilError> {
        self.settings.validate()?;

        let mut seen = HashSet::new();
        let mut permits: HashMap<&str, Arc<Semaphore>> = HashMap::new();
        let mut planned = Vec::with_capacity(specs.len());

        for spec in specs {
            spec.validate()?;
            if !seen.insert(spec.table.as_str()) {
                return Err(DomainError::DuplicateTable(spec.table.clone()).into());
            }
            let datasource = self.datasources.get(&spec.source).cloned().ok_or_else(|| {
                DomainError::UnknownDatasource {
                    table: spec.table.clone(),
                    source_name: spec.source.clone(),
                }
            })?;
            let permits = permits
                .entry(spec.source.as_str())
                .or_insert_with(|| Arc::new(Semaphore::new(self.settings.max_concurrent_queries)))
                .clone();
            planned.push(Planned {
                spec,
                datasource,
                permits,
            });
        }

        Ok(planned)
    }

    /// Loads a table's baseline; an unreadable one counts as absent.
    fn load_baseline(&self, table: &str) -> Option<BaselineSnapshot> {
        match self.store.load(table) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(table, "⚠️ Ignoring unreadable baseline: {}", e);
                None
            }
        }
    }

    /// Runs every table and returns the aggregated result.
    ///
    /// Only configuration errors make this fail; datasource problems end up as
    /// ERROR checks inside the result.
    #[instrument(skip_all, fields(tables = specs.len()))]
    pub async fn run(&self, specs: &[TableSpec]) -> Result<RunResult, VigilError> {
        let planned = self.plan(specs)?;
        let start = Instant::now();
        info!("🚀 Running checks on {} table(s)", planned.len());

        let baselines: Vec<Option<BaselineSnapshot>> = planned
            .iter()
            .map(|p| self.load_baseline(&p.spec.table))
            .collect();

        let run_cancel = CancellationToken::new();
        let watchdog = self.settings.run_timeout.map(|limit| {
            let token = run_cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(limit).await;
                warn!("⏱️ Run timeout of {:?} reached, cancelling in-flight checks", limit);
                token.cancel();
            })
        });

        let runs: Vec<TableRun> = futures::stream::iter(planned.iter().zip(&baselines).map(
            |(plan, baseline)| {
                let ctx = QueryContext::new(
                    plan.spec.table.clone(),
                    plan.datasource.clone(),
                    plan.permits.clone(),
                    &self.settings,
                    run_cancel.clone(),
                );
                async move {
                    CheckRunner::new(ctx, self.settings.max_concurrent_queries)
                        .run(plan.spec, baseline.as_ref())
                        .await
                }
            },
        ))
        .buffered(self.settings.max_concurrent_tables)
        .collect()
        .await;

        if let Some(handle) = watchdog {
            handle.abort();
        }

        // Baselines are written one table at a time, after every check is done.
        let tables: Vec<TableResult> = runs
            .into_iter()
            .zip(baselines)
            .map(|(run, previous)| self.finish_table(run, previous))
            .collect();

        let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        let result = RunResult::new(tables, elapsed_ms);
        info!(
            status = %result.status,
            exit_code = result.exit_code(),
            "🏁 Run finished in {}ms",
            elapsed_ms
        );
        Ok(result)
    }

    fn finish_table(&self, run: TableRun, previous: Option<BaselineSnapshot>) -> TableResult {
        let status = Status::worst(run.checks.iter().map(|c| c.status));

        let baseline = if let Some(reason) = self.settings.baseline_policy.skip_reason(status) {
            BaselineOutcome::Skipped(reason)
        } else if let Some(observed) = &run.observed {
            let snapshot = BaselineSnapshot::capture(
                run.table.clone(),
                observed.row_count,
                observed.columns.clone(),
                previous.as_ref(),
            );
            match self.store.save(&snapshot) {
                Ok(()) => BaselineOutcome::Written,
                Err(e) => {
                    error!(table = %run.table, "❌ Failed to write baseline: {}", e);
                    BaselineOutcome::Failed(e.to_string())
                }
            }
        } else {
            BaselineOutcome::Skipped("schema or row count not observed".to_string())
        };

        TableResult::new(run.table, run.source, run.checks, baseline)
    }
}
