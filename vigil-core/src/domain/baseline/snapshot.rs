// vigil-core/src/domain/baseline/snapshot.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A column as reported by a datasource: name plus (normalized) type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// Last observed state of a table, used as the comparison point for drift checks.
///
/// One snapshot per table; a new capture replaces the previous one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineSnapshot {
    pub table: String,
    pub row_count: u64,
    pub columns: Vec<ColumnDef>,
    pub captured_at: DateTime<Utc>,
    /// Number of snapshots taken for this table, this one included.
    #[serde(default = "first_run")]
    pub run_count: u64,
}

fn first_run() -> u64 {
    1
}

impl BaselineSnapshot {
    /// Snapshot of the current observation, continuing the run counter of `previous`.
    pub fn capture(
        table: impl Into<String>,
        row_count: u64,
        columns: Vec<ColumnDef>,
        previous: Option<&BaselineSnapshot>,
    ) -> Self {
        Self {
            table: table.into(),
            row_count,
            columns,
            captured_at: Utc::now(),
            run_count: previous.map_or(1, |p| p.run_count + 1),
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }
}
