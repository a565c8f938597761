// vigil-core/src/domain/baseline/mod.rs

pub mod drift;
pub mod snapshot;

pub use drift::{SchemaDiff, TypeChange, row_count_change};
pub use snapshot::{BaselineSnapshot, ColumnDef};
