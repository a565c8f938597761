pub mod baseline;
pub mod error;
pub mod project;
pub mod quality;

// Re-exports pratiques pour simplifier les imports ailleurs
pub use error::DomainError;
