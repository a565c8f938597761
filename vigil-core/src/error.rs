// vigil-core/src/error.rs

use crate::domain::error::DomainError;
use crate::infrastructure::error::InfrastructureError;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum VigilError {
    // --- ERREURS DU DOMAINE (TableSpec, seuils, réglages) ---
    #[error(transparent)]
    #[diagnostic(transparent)]
    Domain(#[from] DomainError),

    // --- ERREURS D'INFRASTRUCTURE (IO, YAML, DuckDB) ---
    #[error(transparent)]
    #[diagnostic(transparent)]
    Infrastructure(#[from] InfrastructureError),

    #[error("Internal Error: {0}")]
    InternalError(String),
}

impl VigilError {
    /// True for errors detected before anything ran (exit code 3).
    pub fn is_configuration(&self) -> bool {
        match self {
            VigilError::Domain(e) => e.is_configuration(),
            VigilError::Infrastructure(e) => e.is_configuration(),
            VigilError::InternalError(_) => false,
        }
    }
}

// Manual implementation to avoid duplicate enum variant but keep ergonomics
impl From<std::io::Error> for VigilError {
    fn from(err: std::io::Error) -> Self {
        VigilError::Infrastructure(InfrastructureError::Io(err))
    }
}
