// vigil-core/src/ports/mod.rs

pub mod baseline;
pub mod datasource;

pub use baseline::BaselineStore;
pub use datasource::{Datasource, DatasourceError, DatasourceRegistry};
