// vigil-core/src/domain/quality/check.rs

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::baseline::SchemaDiff;
use crate::domain::quality::threshold::ThresholdConfig;

/// The kinds of checks the engine knows how to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    NullRate,
    RequiredColumns,
    PkUniqueness,
    RowCountChange,
    SchemaDrift,
    RowCountBounds,
    ColumnType,
}

impl CheckKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckKind::NullRate => "null_rate",
            CheckKind::RequiredColumns => "required_columns",
            CheckKind::PkUniqueness => "pk_uniqueness",
            CheckKind::RowCountChange => "row_count_change",
            CheckKind::SchemaDrift => "schema_drift",
            CheckKind::RowCountBounds => "row_count_bounds",
            CheckKind::ColumnType => "column_type",
        }
    }

    /// Zero-tolerance kinds have no WARN tier and accept no threshold override.
    pub fn is_zero_tolerance(self) -> bool {
        matches!(self, CheckKind::RequiredColumns | CheckKind::PkUniqueness)
    }

    /// Kinds whose evaluation compares against the stored baseline.
    pub fn is_drift_sensitive(self) -> bool {
        matches!(self, CheckKind::RowCountChange | CheckKind::SchemaDrift)
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", content = "column", rename_all = "snake_case")]
pub enum CheckTarget {
    Table,
    Column(String),
}

impl CheckTarget {
    pub fn column(&self) -> Option<&str> {
        match self {
            CheckTarget::Table => None,
            CheckTarget::Column(name) => Some(name),
        }
    }
}

/// What a check is measured against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Expectation {
    /// Warn/fail ratios (null rate, row-count change).
    Ratio(ThresholdConfig),
    /// Any violation fails.
    ZeroTolerance,
    /// Added columns warn, removed or retyped columns fail.
    StableSchema,
    RowRange { min: Option<u64>, max: Option<u64> },
    ColumnType { expected: String },
}

/// A single resolved check, ready to be executed against a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckDefinition {
    pub kind: CheckKind,
    pub target: CheckTarget,
    pub expectation: Expectation,
}

impl CheckDefinition {
    pub fn new(kind: CheckKind, target: CheckTarget, expectation: Expectation) -> Self {
        Self {
            kind,
            target,
            expectation,
        }
    }

    /// Stable identifier, e.g. `null_rate:email` or `row_count_change`.
    pub fn id(&self) -> String {
        match &self.target {
            CheckTarget::Table => self.kind.to_string(),
            CheckTarget::Column(column) => format!("{}:{}", self.kind, column),
        }
    }
}

/// The value observed while executing one check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "metric", rename_all = "snake_case")]
pub enum Metric {
    NullCount {
        nulls: u64,
        total: u64,
    },
    DuplicateCount {
        total: u64,
        distinct: u64,
    },
    RowCount {
        current: u64,
        baseline: Option<u64>,
    },
    /// `None` when no baseline exists yet.
    SchemaDiff {
        diff: Option<SchemaDiff>,
        current_columns: usize,
    },
    ColumnType {
        actual: String,
    },
    ColumnMissing {
        column: String,
    },
}

impl Metric {
    /// Fraction of nulls; an empty column has a null rate of zero.
    pub fn null_rate(nulls: u64, total: u64) -> f64 {
        if total == 0 {
            0.0
        } else {
            nulls as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_id() {
        let table_level = CheckDefinition::new(
            CheckKind::RowCountChange,
            CheckTarget::Table,
            Expectation::Ratio(ThresholdConfig::ROW_COUNT_CHANGE),
        );
        assert_eq!(table_level.id(), "row_count_change");

        let column_level = CheckDefinition::new(
            CheckKind::NullRate,
            CheckTarget::Column("email".into()),
            Expectation::Ratio(ThresholdConfig::NULL_RATE),
        );
        assert_eq!(column_level.id(), "null_rate:email");
    }

    #[test]
    fn test_zero_tolerance_kinds() {
        assert!(CheckKind::RequiredColumns.is_zero_tolerance());
        assert!(CheckKind::PkUniqueness.is_zero_tolerance());
        assert!(!CheckKind::NullRate.is_zero_tolerance());
        assert!(!CheckKind::RowCountChange.is_zero_tolerance());
    }

    #[test]
    fn test_null_rate_of_empty_column_is_zero() {
        assert_eq!(Metric::null_rate(0, 0), 0.0);
        assert_eq!(Metric::null_rate(1, 4), 0.25);
    }
}
