// vigil-core/src/infrastructure/adapters/duckdb.rs

use async_trait::async_trait;
use duckdb::{AccessMode, Config, Connection, InterruptHandle, params};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

// Imports Hexagonaux
use crate::domain::baseline::ColumnDef;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::datasource::{Datasource, DatasourceError};

/// Read-only DuckDB datasource.
///
/// The database file is opened lazily on the first query, so a missing or
/// locked file surfaces as a connectivity error on that table's checks.
/// The opened connection is only a root: every query runs on its own clone,
/// so a slow query never holds up queries of other checks.
pub struct DuckDBDatasource {
    name: String,
    path: PathBuf,
    root: Arc<Mutex<Option<Connection>>>,
}

/// Interrupts the query of a session unless disarmed, so a query whose
/// caller gave up (query timeout, run cancellation) stops running.
struct InterruptOnDrop {
    handle: Arc<InterruptHandle>,
    armed: bool,
}

impl InterruptOnDrop {
    fn arm(handle: Arc<InterruptHandle>) -> Self {
        Self {
            handle,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for InterruptOnDrop {
    fn drop(&mut self) {
        if self.armed {
            debug!("🛑 Interrupting abandoned DuckDB query");
            self.handle.interrupt();
        }
    }
}

impl DuckDBDatasource {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            root: Arc::new(Mutex::new(None)),
        }
    }

    /// Wraps an already open connection (in-memory databases, tests).
    pub fn from_connection(name: impl Into<String>, conn: Connection) -> Self {
        Self {
            name: name.into(),
            path: PathBuf::from(":memory:"),
            root: Arc::new(Mutex::new(Some(conn))),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(path: &Path) -> Result<Connection, InfrastructureError> {
        if !path.exists() {
            return Err(InfrastructureError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("database file '{}' does not exist", path.display()),
            )));
        }
        let config = Config::default().access_mode(AccessMode::ReadOnly)?;
        Ok(Connection::open_with_flags(path, config)?)
    }

    /// A fresh connection to the database, opening the root first if needed.
    /// The root lock is held only while opening or cloning.
    fn session(root: &Mutex<Option<Connection>>, path: &Path) -> Result<Connection, DatasourceError> {
        let mut guard = root
            .lock()
            .map_err(|_| DatasourceError::Connectivity("DuckDB Mutex Poisoned".into()))?;
        if guard.is_none() {
            let opened =
                Self::open(path).map_err(|e| DatasourceError::Connectivity(e.to_string()))?;
            *guard = Some(opened);
        }
        match guard.as_ref() {
            Some(connection) => connection
                .try_clone()
                .map_err(|e| DatasourceError::Connectivity(e.to_string())),
            None => Err(DatasourceError::Connectivity("no DuckDB connection".into())),
        }
    }

    /// Runs `f` on a dedicated session in a blocking task.
    ///
    /// Dropping the returned future before it completes interrupts the query.
    async fn with_connection<T, F>(&self, f: F) -> Result<T, DatasourceError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, duckdb::Error> + Send + 'static,
    {
        let root = Arc::clone(&self.root);
        let path = self.path.clone();

        let conn = tokio::task::spawn_blocking(move || Self::session(&root, &path))
            .await
            .map_err(|e| DatasourceError::Query(format!("DuckDB task failed: {e}")))??;

        let mut interrupt = InterruptOnDrop::arm(conn.interrupt_handle());
        let outcome = tokio::task::spawn_blocking(move || {
            f(&conn).map_err(|e| DatasourceError::Query(e.to_string()))
        })
        .await
        .map_err(|e| DatasourceError::Query(format!("DuckDB task failed: {e}")));
        interrupt.disarm();
        outcome?
    }

    async fn count(&self, sql: String) -> Result<u64, DatasourceError> {
        let count: i64 = self
            .with_connection(move |conn| conn.query_row(&sql, [], |row| row.get(0)))
            .await?;
        u64::try_from(count).map_err(|_| DatasourceError::Query(format!("negative count {count}")))
    }
}

/// `"schema"."table"` from `schema.table` or `table`.
pub fn quote_table(table: &str) -> String {
    table
        .split('.')
        .map(quote_ident)
        .collect::<Vec<_>>()
        .join(".")
}

pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Maps DuckDB type names onto the portable names used in baselines and
/// `expected_types` (int, numeric, float, string, boolean, date, timestamp, json).
pub fn normalize_type(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();
    let base = lower.split('(').next().unwrap_or(&lower).trim();
    let normalized = match base {
        "tinyint" | "smallint" | "integer" | "int" | "bigint" | "hugeint" | "utinyint"
        | "usmallint" | "uinteger" | "ubigint" | "uhugeint" | "int1" | "int2" | "int4"
        | "int8" => "int",
        "decimal" | "numeric" => "numeric",
        "real" | "float" | "float4" | "double" | "float8" => "float",
        "varchar" | "text" | "string" | "char" | "bpchar" | "uuid" => "string",
        "boolean" | "bool" => "boolean",
        "date" => "date",
        "timestamp" | "datetime" | "timestamp with time zone" | "timestamptz"
        | "timestamp_s" | "timestamp_ms" | "timestamp_ns" => "timestamp",
        "json" => "json",
        other => other,
    };
    normalized.to_string()
}

#[async_trait]
impl Datasource for DuckDBDatasource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn row_count(&self, table: &str) -> Result<u64, DatasourceError> {
        self.count(format!("SELECT COUNT(*) FROM {}", quote_table(table)))
            .await
    }

    async fn null_count(&self, table: &str, column: &str) -> Result<u64, DatasourceError> {
        self.count(format!(
            "SELECT COUNT(*) FROM {} WHERE {} IS NULL",
            quote_table(table),
            quote_ident(column)
        ))
        .await
    }

    async fn total_count(&self, table: &str) -> Result<u64, DatasourceError> {
        self.row_count(table).await
    }

    async fn distinct_count(&self, table: &str, column: &str) -> Result<u64, DatasourceError> {
        self.count(format!(
            "SELECT COUNT(DISTINCT {}) FROM {}",
            quote_ident(column),
            quote_table(table)
        ))
        .await
    }

    async fn schema(&self, table: &str) -> Result<Vec<ColumnDef>, DatasourceError> {
        let (schema_name, table_name) = match table.split_once('.') {
            Some((schema, name)) => (schema.to_string(), name.to_string()),
            None => ("main".to_string(), table.to_string()),
        };
        let lookup = table_name.clone();

        let columns = self
            .with_connection(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT column_name, data_type FROM information_schema.columns \
                     WHERE table_schema = ? AND table_name = ? ORDER BY ordinal_position",
                )?;
                let rows = stmt.query_map(params![schema_name, lookup], |row| {
                    let name: String = row.get(0)?;
                    let data_type: String = row.get(1)?;
                    Ok(ColumnDef::new(name, normalize_type(&data_type)))
                })?;
                rows.collect::<Result<Vec<_>, _>>()
            })
            .await?;

        if columns.is_empty() {
            return Err(DatasourceError::Query(format!(
                "table '{table}' not found"
            )));
        }
        Ok(columns)
    }
}
