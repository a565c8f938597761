// vigil-core/src/domain/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum DomainError {
    #[error("Invalid table spec '{table}': {reason}")]
    #[diagnostic(code(vigil::domain::table_spec))]
    InvalidTableSpec { table: String, reason: String },

    #[error("Invalid thresholds for '{table}' ({check}): {reason}")]
    #[diagnostic(
        code(vigil::domain::threshold),
        help("Thresholds are fractions with 0 <= warn <= fail. required_columns and pk_uniqueness accept no override.")
    )]
    InvalidThreshold {
        table: String,
        check: String,
        reason: String,
    },

    #[error("Table '{table}' references unknown datasource '{source_name}'")]
    #[diagnostic(
        code(vigil::domain::unknown_datasource),
        help("Declare the datasource under `datasources:` in vigil.yaml.")
    )]
    UnknownDatasource { table: String, source_name: String },

    #[error("Table '{0}' is declared more than once")]
    #[diagnostic(code(vigil::domain::duplicate_table))]
    DuplicateTable(String),

    #[error("Invalid run settings: {0}")]
    #[diagnostic(code(vigil::domain::settings))]
    InvalidSettings(String),

    #[error("Baseline for '{table}' is unreadable: {reason}")]
    #[diagnostic(
        code(vigil::domain::corrupt_baseline),
        help("Delete it with `vigil reset <table>`; the next run writes a fresh one.")
    )]
    CorruptBaseline { table: String, reason: String },
}

impl DomainError {
    /// Errors detected before any query is issued.
    pub fn is_configuration(&self) -> bool {
        !matches!(self, DomainError::CorruptBaseline { .. })
    }
}
