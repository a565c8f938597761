// vigil-core/src/domain/project/table.rs

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::domain::baseline::ColumnDef;
use crate::domain::error::DomainError;
use crate::domain::quality::{
    CheckDefinition, CheckKind, CheckTarget, Expectation, ThresholdConfig, ThresholdOverride,
};

/// Per-table switches for the checks that run without explicit column lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckToggles {
    #[serde(default = "enabled")]
    pub null_rate: bool,
    #[serde(default = "enabled")]
    pub row_count_change: bool,
    #[serde(default = "enabled")]
    pub schema_drift: bool,
}

fn enabled() -> bool {
    true
}

impl Default for CheckToggles {
    fn default() -> Self {
        Self {
            null_rate: true,
            row_count_change: true,
            schema_drift: true,
        }
    }
}

/// A fully resolved table configuration, as handed to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSpec {
    pub table: String,
    /// Name of the datasource the table lives in.
    pub source: String,
    #[serde(default)]
    pub primary_key: Option<String>,
    #[serde(default)]
    pub required_columns: Vec<String>,
    /// Columns subject to the null-rate check; `None` means every column.
    #[serde(default)]
    pub null_rate_columns: Option<Vec<String>>,
    #[serde(default)]
    pub expected_types: BTreeMap<String, String>,
    #[serde(default)]
    pub min_rows: Option<u64>,
    #[serde(default)]
    pub max_rows: Option<u64>,
    #[serde(default)]
    pub thresholds: BTreeMap<CheckKind, ThresholdOverride>,
    #[serde(default)]
    pub checks: CheckToggles,
}

impl TableSpec {
    pub fn new(table: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            source: source.into(),
            primary_key: None,
            required_columns: Vec::new(),
            null_rate_columns: None,
            expected_types: BTreeMap::new(),
            min_rows: None,
            max_rows: None,
            thresholds: BTreeMap::new(),
            checks: CheckToggles::default(),
        }
    }

    pub fn with_primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = Some(column.into());
        self
    }

    pub fn with_required_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_null_rate_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.null_rate_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_expected_type(mut self, column: impl Into<String>, data_type: impl Into<String>) -> Self {
        self.expected_types.insert(column.into(), data_type.into());
        self
    }

    pub fn with_row_bounds(mut self, min: Option<u64>, max: Option<u64>) -> Self {
        self.min_rows = min;
        self.max_rows = max;
        self
    }

    pub fn with_threshold(mut self, kind: CheckKind, threshold: ThresholdOverride) -> Self {
        self.thresholds.insert(kind, threshold);
        self
    }

    pub fn with_checks(mut self, checks: CheckToggles) -> Self {
        self.checks = checks;
        self
    }

    fn invalid(&self, reason: impl Into<String>) -> DomainError {
        DomainError::InvalidTableSpec {
            table: self.table.clone(),
            reason: reason.into(),
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.table.trim().is_empty() {
            return Err(self.invalid("table name is empty"));
        }
        if self.source.trim().is_empty() {
            return Err(self.invalid("no datasource given"));
        }

        let named_columns = self
            .primary_key
            .iter()
            .chain(&self.required_columns)
            .chain(self.null_rate_columns.iter().flatten())
            .chain(self.expected_types.keys());
        for column in named_columns {
            if column.trim().is_empty() {
                return Err(self.invalid("empty column name"));
            }
        }

        if let (Some(min), Some(max)) = (self.min_rows, self.max_rows) {
            if min > max {
                return Err(self.invalid(format!("min_rows {min} is greater than max_rows {max}")));
            }
        }

        for (kind, threshold) in &self.thresholds {
            let invalid = |reason: String| DomainError::InvalidThreshold {
                table: self.table.clone(),
                check: kind.to_string(),
                reason,
            };
            if kind.is_zero_tolerance() && !threshold.is_empty() {
                return Err(invalid("zero-tolerance check accepts no thresholds".into()));
            }
            let Some(defaults) = ThresholdConfig::defaults_for(*kind) else {
                if threshold.is_empty() {
                    continue;
                }
                return Err(invalid("check does not use warn/fail thresholds".into()));
            };
            defaults.merged(threshold).validate().map_err(invalid)?;
        }

        Ok(())
    }

    /// Default thresholds for `kind` with this table's override applied.
    pub fn thresholds_for(&self, kind: CheckKind) -> Option<ThresholdConfig> {
        let defaults = ThresholdConfig::defaults_for(kind)?;
        Some(match self.thresholds.get(&kind) {
            Some(threshold) => defaults.merged(threshold),
            None => defaults,
        })
    }

    /// Expands the table configuration into concrete checks, in execution order.
    ///
    /// `schema` is the current column list when it could be fetched. Without it
    /// an "all columns" null-rate check collapses into a single table-level check.
    pub fn resolve_checks(&self, schema: Option<&[ColumnDef]>) -> Vec<CheckDefinition> {
        let mut checks = Vec::new();

        if self.checks.schema_drift {
            checks.push(CheckDefinition::new(
                CheckKind::SchemaDrift,
                CheckTarget::Table,
                Expectation::StableSchema,
            ));
        }

        for (column, expected) in &self.expected_types {
            checks.push(CheckDefinition::new(
                CheckKind::ColumnType,
                CheckTarget::Column(column.clone()),
                Expectation::ColumnType {
                    expected: expected.clone(),
                },
            ));
        }

        if self.checks.null_rate {
            let thresholds = self
                .thresholds_for(CheckKind::NullRate)
                .unwrap_or(ThresholdConfig::NULL_RATE);
            let null_check =
                |target| CheckDefinition::new(CheckKind::NullRate, target, Expectation::Ratio(thresholds));

            match (&self.null_rate_columns, schema) {
                (Some(columns), _) => {
                    let mut seen = BTreeSet::new();
                    for column in columns.iter().filter(|c| seen.insert(c.as_str())) {
                        checks.push(null_check(CheckTarget::Column(column.clone())));
                    }
                }
                (None, Some(schema)) => {
                    for column in schema {
                        checks.push(null_check(CheckTarget::Column(column.name.clone())));
                    }
                }
                (None, None) => checks.push(null_check(CheckTarget::Table)),
            }
        }

        let mut seen = BTreeSet::new();
        for column in self.required_columns.iter().filter(|c| seen.insert(c.as_str())) {
            checks.push(CheckDefinition::new(
                CheckKind::RequiredColumns,
                CheckTarget::Column(column.clone()),
                Expectation::ZeroTolerance,
            ));
        }

        if let Some(pk) = &self.primary_key {
            checks.push(CheckDefinition::new(
                CheckKind::PkUniqueness,
                CheckTarget::Column(pk.clone()),
                Expectation::ZeroTolerance,
            ));
        }

        if self.min_rows.is_some() || self.max_rows.is_some() {
            checks.push(CheckDefinition::new(
                CheckKind::RowCountBounds,
                CheckTarget::Table,
                Expectation::RowRange {
                    min: self.min_rows,
                    max: self.max_rows,
                },
            ));
        }

        if self.checks.row_count_change {
            let thresholds = self
                .thresholds_for(CheckKind::RowCountChange)
                .unwrap_or(ThresholdConfig::ROW_COUNT_CHANGE);
            checks.push(CheckDefinition::new(
                CheckKind::RowCountChange,
                CheckTarget::Table,
                Expectation::Ratio(thresholds),
            ));
        }

        checks
    }
}
