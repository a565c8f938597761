// vigil-core/src/domain/quality/result.rs

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::quality::check::{CheckDefinition, CheckKind, CheckTarget, Metric};
use crate::domain::quality::evaluator::Evaluation;
use crate::domain::quality::status::Status;

/// Why a check could not produce a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The datasource could not be reached.
    Connectivity,
    Query,
    Timeout,
    /// The run timeout elapsed while the check was in flight.
    Cancelled,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Connectivity => "connectivity",
            FailureKind::Query => "query",
            FailureKind::Timeout => "timeout",
            FailureKind::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckFailure {
    pub kind: FailureKind,
    pub reason: String,
}

impl CheckFailure {
    pub fn new(kind: FailureKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub id: String,
    pub kind: CheckKind,
    pub target: CheckTarget,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<Metric>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<CheckFailure>,
}

impl CheckResult {
    pub fn from_evaluation(check: &CheckDefinition, metric: Metric, evaluation: Evaluation) -> Self {
        Self {
            id: check.id(),
            kind: check.kind,
            target: check.target.clone(),
            status: evaluation.status,
            metric: Some(metric),
            message: evaluation.message,
            hint: evaluation.hint,
            failure: None,
        }
    }

    /// ERROR result for a check whose metric could not be obtained.
    pub fn error(check: &CheckDefinition, failure: CheckFailure) -> Self {
        Self {
            id: check.id(),
            kind: check.kind,
            target: check.target.clone(),
            status: Status::Error,
            metric: None,
            message: format!("{} error: {}", failure.kind, failure.reason),
            hint: None,
            failure: Some(failure),
        }
    }

    pub fn is_connectivity_error(&self) -> bool {
        self.failure
            .as_ref()
            .is_some_and(|f| f.kind == FailureKind::Connectivity)
    }
}

/// What happened to a table's baseline at the end of the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum BaselineOutcome {
    Written,
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableResult {
    pub table: String,
    pub source: String,
    pub status: Status,
    pub checks: Vec<CheckResult>,
    pub baseline: BaselineOutcome,
}

impl TableResult {
    pub fn new(
        table: impl Into<String>,
        source: impl Into<String>,
        checks: Vec<CheckResult>,
        baseline: BaselineOutcome,
    ) -> Self {
        let status = Status::worst(checks.iter().map(|c| c.status));
        Self {
            table: table.into(),
            source: source.into(),
            status,
            checks,
            baseline,
        }
    }

    pub fn has_connectivity_error(&self) -> bool {
        self.checks.iter().any(CheckResult::is_connectivity_error)
    }

    pub fn count(&self, status: Status) -> usize {
        self.checks.iter().filter(|c| c.status == status).count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub tables: usize,
    pub checks: usize,
    pub passed: usize,
    pub warned: usize,
    pub failed: usize,
    pub errored: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub status: Status,
    pub exit_code: i32,
    pub elapsed_ms: u64,
    pub totals: Totals,
    pub tables: Vec<TableResult>,
}

impl RunResult {
    pub fn new(tables: Vec<TableResult>, elapsed_ms: u64) -> Self {
        let status = Status::worst(tables.iter().map(|t| t.status));
        let exit_code = if tables.iter().any(TableResult::has_connectivity_error) {
            Status::Error.exit_code()
        } else {
            status.exit_code()
        };

        let mut totals = Totals {
            tables: tables.len(),
            ..Totals::default()
        };
        for check in tables.iter().flat_map(|t| &t.checks) {
            totals.checks += 1;
            match check.status {
                Status::Pass => totals.passed += 1,
                Status::Warn => totals.warned += 1,
                Status::Fail => totals.failed += 1,
                Status::Error => totals.errored += 1,
            }
        }

        Self {
            status,
            exit_code,
            elapsed_ms,
            totals,
            tables,
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    pub fn table(&self, name: &str) -> Option<&TableResult> {
        self.tables.iter().find(|t| t.table == name)
    }
}
