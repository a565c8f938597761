// vigil-core/src/domain/quality/evaluator.rs
//
// Pure evaluation: (check, observed metric) -> status + explanation.
// Nothing in here touches a datasource or the clock.

use serde::{Deserialize, Serialize};

use crate::domain::baseline::{SchemaDiff, row_count_change};
use crate::domain::quality::check::{CheckDefinition, CheckKind, Expectation, Metric};
use crate::domain::quality::status::Status;
use crate::domain::quality::threshold::ThresholdConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub status: Status,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl Evaluation {
    fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            hint: None,
        }
    }

    fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

fn pct(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}

pub fn evaluate(check: &CheckDefinition, metric: &Metric) -> Evaluation {
    let column = check.target.column().unwrap_or("<table>");

    match (check.kind, metric, &check.expectation) {
        (_, Metric::ColumnMissing { column }, _) => Evaluation::new(
            Status::Fail,
            format!("Column '{column}' does not exist in the table."),
        )
        .with_hint("Check the column name in the configuration or the upstream model."),

        (CheckKind::NullRate, Metric::NullCount { nulls, total }, Expectation::Ratio(t)) => {
            null_rate(column, *nulls, *total, t)
        }

        (CheckKind::RequiredColumns, Metric::NullCount { nulls, total }, _) => {
            required_column(column, *nulls, *total)
        }

        (CheckKind::PkUniqueness, Metric::DuplicateCount { total, distinct }, _) => {
            pk_uniqueness(column, *total, *distinct)
        }

        (CheckKind::RowCountChange, Metric::RowCount { current, baseline }, Expectation::Ratio(t)) => {
            row_count_delta(*current, *baseline, t)
        }

        (
            CheckKind::RowCountBounds,
            Metric::RowCount { current, .. },
            Expectation::RowRange { min, max },
        ) => row_bounds(*current, *min, *max),

        (
            CheckKind::SchemaDrift,
            Metric::SchemaDiff {
                diff,
                current_columns,
            },
            _,
        ) => schema_drift(diff.as_ref(), *current_columns),

        (CheckKind::ColumnType, Metric::ColumnType { actual }, Expectation::ColumnType { expected }) => {
            column_type(column, actual, expected)
        }

        (kind, metric, _) => Evaluation::new(
            Status::Error,
            format!("{kind} cannot be evaluated from {metric:?}"),
        ),
    }
}

fn null_rate(column: &str, nulls: u64, total: u64, thresholds: &ThresholdConfig) -> Evaluation {
    if nulls == 0 {
        return Evaluation::new(Status::Pass, format!("'{column}' has no nulls."));
    }

    let rate = Metric::null_rate(nulls, total);
    match thresholds.classify(rate) {
        Status::Fail => Evaluation::new(
            Status::Fail,
            format!(
                "'{column}' null rate {} ({nulls} of {total} rows) reaches the fail threshold of {}.",
                pct(rate),
                pct(thresholds.fail)
            ),
        )
        .with_hint("Investigate the upstream source for missing values."),
        Status::Warn => Evaluation::new(
            Status::Warn,
            format!(
                "'{column}' null rate {} ({nulls} of {total} rows) reaches the warn threshold of {}.",
                pct(rate),
                pct(thresholds.warn)
            ),
        ),
        _ => Evaluation::new(
            Status::Pass,
            format!("'{column}' null rate {} is within threshold.", pct(rate)),
        ),
    }
}

fn required_column(column: &str, nulls: u64, total: u64) -> Evaluation {
    if nulls == 0 {
        return Evaluation::new(
            Status::Pass,
            format!("Required column '{column}' is complete."),
        );
    }
    Evaluation::new(
        Status::Fail,
        format!(
            "Required column '{column}' has {nulls} null value(s) out of {total} rows ({}).",
            pct(Metric::null_rate(nulls, total))
        ),
    )
    .with_hint(format!(
        "Filter or backfill rows where '{column}' is null before loading."
    ))
}

fn pk_uniqueness(column: &str, total: u64, distinct: u64) -> Evaluation {
    let duplicates = total.saturating_sub(distinct);
    if duplicates == 0 {
        return Evaluation::new(
            Status::Pass,
            format!("'{column}' is fully unique ({distinct} distinct values)."),
        );
    }
    Evaluation::new(
        Status::Fail,
        format!(
            "Primary key '{column}' has {duplicates} duplicate value(s) ({distinct} distinct out of {total} rows)."
        ),
    )
    .with_hint("Deduplicate on the primary key or fix the join producing repeated keys.")
}

fn row_count_delta(current: u64, baseline: Option<u64>, thresholds: &ThresholdConfig) -> Evaluation {
    let Some(previous) = baseline else {
        return Evaluation::new(
            Status::Pass,
            format!("No prior baseline; {current} rows recorded as the starting point."),
        );
    };

    let change = row_count_change(current, previous);
    let direction = if change < 0.0 { "dropped" } else { "grew" };
    let magnitude = change.abs();

    match thresholds.classify(magnitude) {
        Status::Fail => Evaluation::new(
            Status::Fail,
            format!(
                "Row count {direction} by {} ({previous} -> {current}), fail threshold is {}.",
                pct(magnitude),
                pct(thresholds.fail)
            ),
        )
        .with_hint("Check for a partial load, a truncated table or a duplicated batch."),
        Status::Warn => Evaluation::new(
            Status::Warn,
            format!(
                "Row count {direction} by {} ({previous} -> {current}), warn threshold is {}.",
                pct(magnitude),
                pct(thresholds.warn)
            ),
        ),
        _ => Evaluation::new(
            Status::Pass,
            format!(
                "Row count changed by {} ({previous} -> {current}).",
                pct(change)
            ),
        ),
    }
}

fn row_bounds(current: u64, min: Option<u64>, max: Option<u64>) -> Evaluation {
    if let Some(min) = min.filter(|min| current < *min) {
        return Evaluation::new(
            Status::Fail,
            format!("Row count {current} is below the minimum of {min}."),
        );
    }
    if let Some(max) = max.filter(|max| current > *max) {
        return Evaluation::new(
            Status::Fail,
            format!("Row count {current} is above the maximum of {max}."),
        );
    }
    Evaluation::new(
        Status::Pass,
        format!("Row count {current} is within the expected range."),
    )
}

fn schema_drift(diff: Option<&SchemaDiff>, current_columns: usize) -> Evaluation {
    let Some(diff) = diff else {
        return Evaluation::new(
            Status::Pass,
            format!("No prior baseline; {current_columns} columns recorded."),
        );
    };

    if diff.is_empty() {
        return Evaluation::new(
            Status::Pass,
            format!("Schema unchanged; {current_columns} columns match the baseline."),
        );
    }

    let mut findings = Vec::new();
    let mut status = Status::Pass;

    if !diff.removed.is_empty() {
        status = status.max(Status::Fail);
        findings.push(format!("column removed: {}", diff.removed.join(", ")));
    }
    for change in &diff.retyped {
        status = status.max(Status::Fail);
        findings.push(format!(
            "column type changed: {} ({} -> {})",
            change.column, change.before, change.after
        ));
    }
    if !diff.added.is_empty() {
        status = status.max(Status::Warn);
        findings.push(format!("column added: {}", diff.added.join(", ")));
    }

    let evaluation = Evaluation::new(status, format!("Schema drift: {}.", findings.join("; ")));
    if status == Status::Fail {
        evaluation.with_hint("Downstream consumers may break; restore the column or update contracts.")
    } else {
        evaluation
    }
}

fn column_type(column: &str, actual: &str, expected: &str) -> Evaluation {
    if actual.eq_ignore_ascii_case(expected) {
        Evaluation::new(
            Status::Pass,
            format!("'{column}' is '{actual}' as expected."),
        )
    } else {
        Evaluation::new(
            Status::Fail,
            format!("'{column}' is '{actual}', expected '{expected}'."),
        )
        .with_hint("Cast the column upstream or update expected_types.")
    }
}
