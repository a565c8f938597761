// vigil-core/src/infrastructure/baseline/mod.rs

pub mod json;
pub mod memory;

pub use json::JsonBaselineStore;
pub use memory::MemoryBaselineStore;
