// vigil-core/src/infrastructure/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum DatabaseError {
    #[error("DuckDB Engine Error: {0}")]
    #[diagnostic(
        code(vigil::infra::database::duckdb),
        help("An error occurred inside the SQL engine.")
    )]
    DuckDB(#[from] duckdb::Error),
}

#[derive(Error, Debug, Diagnostic)]
pub enum InfrastructureError {
    // --- DATABASE (Abstracted) ---
    #[error(transparent)]
    #[diagnostic(transparent)]
    Database(#[from] DatabaseError),

    // --- FILESYSTEM (IO) ---
    #[error("File System Error: {0}")]
    #[diagnostic(
        code(vigil::infra::io),
        help("Check file permissions or path validity.")
    )]
    Io(#[from] std::io::Error),

    // --- CONFIG / YAML ---
    #[error("YAML Parsing Error: {0}")]
    #[diagnostic(
        code(vigil::infra::yaml),
        help("Check your YAML syntax (indentation, types).")
    )]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid configuration values: {0}")]
    #[diagnostic(
        code(vigil::infra::validation),
        help("Percentages are between 0 and 100, limits are at least 1.")
    )]
    Validation(#[from] validator::ValidationErrors),

    #[error("Configuration Error: {0}")]
    #[diagnostic(code(vigil::infra::config))]
    ConfigError(String),

    #[error("Project configuration not found at '{0}'")]
    #[diagnostic(
        code(vigil::infra::config_missing),
        help("Run `vigil init` to create a starter vigil.yaml.")
    )]
    ConfigNotFound(String),

    // --- BASELINES (JSON) ---
    #[error("JSON Error: {0}")]
    #[diagnostic(code(vigil::infra::json))]
    JsonError(#[from] serde_json::Error),
}

impl InfrastructureError {
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            InfrastructureError::YamlError(_)
                | InfrastructureError::Validation(_)
                | InfrastructureError::ConfigError(_)
                | InfrastructureError::ConfigNotFound(_)
        )
    }
}

// Manual implementation for shortcuts (e.g. `?` operator on duckdb calls)
impl From<duckdb::Error> for InfrastructureError {
    fn from(err: duckdb::Error) -> Self {
        InfrastructureError::Database(DatabaseError::DuckDB(err))
    }
}
