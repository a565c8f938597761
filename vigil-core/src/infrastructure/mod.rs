// vigil-core/src/infrastructure/mod.rs

pub mod adapters;
pub mod baseline;
pub mod config;
pub mod error;
pub mod fs;

pub use adapters::DuckDBDatasource;
pub use baseline::{JsonBaselineStore, MemoryBaselineStore};
pub use config::{ProjectConfig, load_project_config};
