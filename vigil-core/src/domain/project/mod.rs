// vigil-core/src/domain/project/mod.rs

pub mod settings;
pub mod table;

pub use settings::{BaselinePolicy, RetryPolicy, RunSettings};
pub use table::{CheckToggles, TableSpec};
