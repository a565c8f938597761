// vigil-core/src/domain/baseline/drift.rs

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::domain::baseline::snapshot::ColumnDef;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeChange {
    pub column: String,
    pub before: String,
    pub after: String,
}

/// Difference between the baseline column set and the current one.
/// Every list is sorted by column name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SchemaDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub retyped: Vec<TypeChange>,
}

impl SchemaDiff {
    /// added = current − baseline, removed = baseline − current (by name);
    /// columns in both whose type differs (case-insensitive) are `retyped`.
    pub fn between(baseline: &[ColumnDef], current: &[ColumnDef]) -> SchemaDiff {
        let before: BTreeMap<&str, &str> = baseline
            .iter()
            .map(|c| (c.name.as_str(), c.data_type.as_str()))
            .collect();
        let after: BTreeMap<&str, &str> = current
            .iter()
            .map(|c| (c.name.as_str(), c.data_type.as_str()))
            .collect();

        let before_names: BTreeSet<&str> = before.keys().copied().collect();
        let after_names: BTreeSet<&str> = after.keys().copied().collect();

        let added = after_names
            .difference(&before_names)
            .map(|s| s.to_string())
            .collect();
        let removed = before_names
            .difference(&after_names)
            .map(|s| s.to_string())
            .collect();

        let retyped = before_names
            .intersection(&after_names)
            .filter_map(|name| {
                let (old, new) = (before[name], after[name]);
                (!old.eq_ignore_ascii_case(new)).then(|| TypeChange {
                    column: name.to_string(),
                    before: old.to_string(),
                    after: new.to_string(),
                })
            })
            .collect();

        SchemaDiff {
            added,
            removed,
            retyped,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.retyped.is_empty()
    }
}

/// Signed relative change `(current − baseline) / baseline`.
/// A zero baseline is treated as one row so the result stays finite.
pub fn row_count_change(current: u64, baseline: u64) -> f64 {
    let delta = current as f64 - baseline as f64;
    delta / baseline.max(1) as f64
}
