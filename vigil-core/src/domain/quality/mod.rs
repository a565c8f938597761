// vigil-core/src/domain/quality/mod.rs

pub mod check;
pub mod evaluator;
pub mod result;
pub mod status;
pub mod threshold;

pub use check::{CheckDefinition, CheckKind, CheckTarget, Expectation, Metric};
pub use evaluator::{Evaluation, evaluate};
pub use result::{
    BaselineOutcome, CheckFailure, CheckResult, FailureKind, RunResult, TableResult, Totals,
};
pub use status::Status;
pub use threshold::{ThresholdConfig, ThresholdOverride};
