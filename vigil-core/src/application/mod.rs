// vigil-core/src/application/mod.rs

pub mod engine;
pub mod orchestrator;
pub mod runner;

// --- RE-EXPORTS (FACADE PATTERN) ---
// Le CLI fait simplement `use vigil_core::application::Orchestrator;`

pub use engine::{FetchFailure, QueryContext, fetch_metric};
pub use orchestrator::Orchestrator;
pub use runner::{CheckRunner, Observation, TableRun};
