// vigil-core/src/domain/quality/status.rs

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a check, a table or a whole run.
///
/// The declaration order is the severity order: `Pass < Warn < Fail < Error`.
/// Every aggregation is a max-reduce over this order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    #[default]
    Pass,
    Warn,
    Fail,
    Error,
}

impl Status {
    /// Worst status of the iterator, `Pass` when empty.
    pub fn worst<I>(statuses: I) -> Status
    where
        I: IntoIterator<Item = Status>,
    {
        statuses.into_iter().max().unwrap_or(Status::Pass)
    }

    /// Process exit code for a run ending in this status.
    pub fn exit_code(self) -> i32 {
        match self {
            Status::Pass => 0,
            Status::Warn => 1,
            Status::Fail => 2,
            Status::Error => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pass => "PASS",
            Status::Warn => "WARN",
            Status::Fail => "FAIL",
            Status::Error => "ERROR",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
