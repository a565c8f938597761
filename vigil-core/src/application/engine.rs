// vigil-core/src/application/engine.rs

use std::future::Future;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::domain::project::{RetryPolicy, RunSettings};
use crate::domain::quality::{CheckFailure, FailureKind};
use crate::ports::datasource::{Datasource, DatasourceError};

/// Everything a metric query of one table needs: the datasource, its
/// query permits, the limits, and the two ways the query can be cut short.
pub struct QueryContext {
    pub table: String,
    pub datasource: Arc<dyn Datasource>,
    permits: Arc<Semaphore>,
    query_timeout: Duration,
    retry: RetryPolicy,
    run_cancel: CancellationToken,
    table_down: CancellationToken,
    down_reason: OnceLock<String>,
}

impl QueryContext {
    pub fn new(
        table: impl Into<String>,
        datasource: Arc<dyn Datasource>,
        permits: Arc<Semaphore>,
        settings: &RunSettings,
        run_cancel: CancellationToken,
    ) -> Self {
        Self {
            table: table.into(),
            datasource,
            permits,
            query_timeout: settings.query_timeout,
            retry: settings.retry,
            run_cancel,
            table_down: CancellationToken::new(),
            down_reason: OnceLock::new(),
        }
    }

    /// Marks the datasource unreachable for this table: no new query is issued.
    fn mark_down(&self, reason: &str) {
        let _ = self.down_reason.set(reason.to_string());
        self.table_down.cancel();
    }

    fn down_reason(&self) -> String {
        self.down_reason
            .get()
            .cloned()
            .unwrap_or_else(|| "datasource unreachable".to_string())
    }

    pub fn is_down(&self) -> bool {
        self.table_down.is_cancelled()
    }
}

/// Why a metric could not be obtained.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchFailure {
    Connectivity(String),
    /// Skipped because an earlier query of the same table lost the datasource.
    ShortCircuited(String),
    Query { reason: String, attempts: u32 },
    Timeout(Duration),
    Cancelled,
}

impl From<FetchFailure> for CheckFailure {
    fn from(failure: FetchFailure) -> Self {
        match failure {
            FetchFailure::Connectivity(reason) => CheckFailure::new(FailureKind::Connectivity, reason),
            FetchFailure::ShortCircuited(reason) => CheckFailure::new(
                FailureKind::Connectivity,
                format!("not executed, datasource unreachable ({reason})"),
            ),
            FetchFailure::Query { reason, attempts } => CheckFailure::new(
                FailureKind::Query,
                format!("{reason} (after {attempts} attempt(s))"),
            ),
            FetchFailure::Timeout(limit) => CheckFailure::new(
                FailureKind::Timeout,
                format!("query exceeded the {limit:?} timeout"),
            ),
            FetchFailure::Cancelled => CheckFailure::new(
                FailureKind::Cancelled,
                "run timeout elapsed before the check completed",
            ),
        }
    }
}

/// Runs one metric query under the table's limits.
///
/// Each attempt holds a datasource permit and is bounded by the query timeout.
/// Query errors are retried with exponential backoff up to `max_attempts`;
/// a connectivity error marks the table down and is returned immediately;
/// timeouts are not retried.
pub async fn fetch_metric<T, F, Fut>(ctx: &QueryContext, metric: &str, op: F) -> Result<T, FetchFailure>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, DatasourceError>>,
{
    let mut delay = ctx.retry.first_delay();
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        if ctx.run_cancel.is_cancelled() {
            return Err(FetchFailure::Cancelled);
        }
        if ctx.is_down() {
            return Err(FetchFailure::ShortCircuited(ctx.down_reason()));
        }

        let start = Instant::now();
        let outcome = tokio::select! {
            biased;
            _ = ctx.run_cancel.cancelled() => return Err(FetchFailure::Cancelled),
            _ = ctx.table_down.cancelled() => return Err(FetchFailure::ShortCircuited(ctx.down_reason())),
            outcome = async {
                let _permit = match ctx.permits.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => return Ok(Err(DatasourceError::Connectivity("query pool closed".into()))),
                };
                tokio::time::timeout(ctx.query_timeout, op()).await
            } => outcome,
        };
        let elapsed = start.elapsed();

        match outcome {
            Ok(Ok(value)) => {
                debug!(table = %ctx.table, metric, attempt, "✅ Metric fetched in {:.2?}", elapsed);
                return Ok(value);
            }
            Ok(Err(DatasourceError::Connectivity(reason))) => {
                warn!(
                    table = %ctx.table,
                    metric,
                    "🔌 Datasource '{}' unreachable, skipping remaining checks: {}",
                    ctx.datasource.name(),
                    reason
                );
                ctx.mark_down(&reason);
                return Err(FetchFailure::Connectivity(reason));
            }
            Ok(Err(DatasourceError::Query(reason))) => {
                if attempt >= ctx.retry.max_attempts {
                    error!(table = %ctx.table, metric, attempt, "❌ Query failed after {:.2?}: {}", elapsed, reason);
                    return Err(FetchFailure::Query {
                        reason,
                        attempts: attempt,
                    });
                }
                warn!(
                    table = %ctx.table,
                    metric,
                    attempt,
                    "⚠️ Query failed ({}), retrying in {:?}",
                    reason,
                    delay
                );
                tokio::select! {
                    biased;
                    _ = ctx.run_cancel.cancelled() => return Err(FetchFailure::Cancelled),
                    _ = ctx.table_down.cancelled() => return Err(FetchFailure::ShortCircuited(ctx.down_reason())),
                    _ = tokio::time::sleep(delay) => {}
                }
                delay = ctx.retry.next_delay(delay);
            }
            Err(_elapsed) => {
                warn!(table = %ctx.table, metric, "⏱️ Query timed out after {:?}", ctx.query_timeout);
                return Err(FetchFailure::Timeout(ctx.query_timeout));
            }
        }
    }
}
