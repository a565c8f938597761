// vigil-core/src/ports/datasource.rs

// Contrat d'accès aux données : le moteur ne sait pas s'il parle à DuckDB,
// Postgres ou à un mock de test.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::domain::baseline::ColumnDef;

/// The two failure classes the engine reacts to differently.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DatasourceError {
    /// The datasource cannot be reached: every remaining check of the table is short-circuited.
    #[error("datasource unreachable: {0}")]
    Connectivity(String),

    /// A single query failed: retried, then reported on the check alone.
    #[error("query failed: {0}")]
    Query(String),
}

/// Read-only metric queries against one datasource.
///
/// Implementations must be shareable across tasks; the engine bounds the number
/// of concurrent calls itself.
#[async_trait]
pub trait Datasource: Send + Sync {
    fn name(&self) -> &str;

    async fn row_count(&self, table: &str) -> Result<u64, DatasourceError>;

    async fn null_count(&self, table: &str, column: &str) -> Result<u64, DatasourceError>;

    async fn total_count(&self, table: &str) -> Result<u64, DatasourceError>;

    /// Number of distinct non-null values.
    async fn distinct_count(&self, table: &str, column: &str) -> Result<u64, DatasourceError>;

    /// Current columns, in table order.
    async fn schema(&self, table: &str) -> Result<Vec<ColumnDef>, DatasourceError>;
}

/// Datasources by configured name.
pub type DatasourceRegistry = HashMap<String, Arc<dyn Datasource>>;
