// vigil-core/src/infrastructure/config/project.rs

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};
use validator::Validate;

use crate::domain::project::{BaselinePolicy, CheckToggles, RetryPolicy, RunSettings, TableSpec};
use crate::domain::quality::{CheckKind, ThresholdOverride};
use crate::infrastructure::adapters::DuckDBDatasource;
use crate::infrastructure::baseline::JsonBaselineStore;
use crate::infrastructure::baseline::json::DEFAULT_BASELINE_DIR;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::datasource::{Datasource, DatasourceRegistry};

pub const CONFIG_CANDIDATES: [&str; 2] = ["vigil.yaml", "vigil.yml"];

// --- RAW YAML SHAPE ---

#[derive(Debug, Deserialize, Validate, Default)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    datasources: BTreeMap<String, RawDatasource>,

    #[validate(nested)]
    #[serde(default)]
    defaults: RawDefaults,

    #[validate(nested)]
    #[serde(default)]
    run: RawRun,

    #[serde(default)]
    tables: BTreeMap<String, RawTable>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "lowercase")]
enum RawDatasource {
    Duckdb { path: PathBuf },
}

#[derive(Debug, Deserialize, Validate, Default)]
#[serde(deny_unknown_fields)]
struct RawDefaults {
    #[validate(range(min = 0.0, max = 100.0))]
    null_warn_pct: Option<f64>,
    #[validate(range(min = 0.0, max = 100.0))]
    null_fail_pct: Option<f64>,
    #[validate(range(min = 0.0))]
    volume_warn_pct: Option<f64>,
    #[validate(range(min = 0.0))]
    volume_fail_pct: Option<f64>,
}

#[derive(Debug, Deserialize, Validate, Default)]
#[serde(deny_unknown_fields)]
struct RawRun {
    #[validate(range(min = 1))]
    query_timeout_secs: Option<u64>,
    #[validate(range(min = 1))]
    run_timeout_secs: Option<u64>,
    #[validate(range(min = 1, max = 256))]
    max_concurrent_queries: Option<usize>,
    #[validate(range(min = 1, max = 256))]
    max_concurrent_tables: Option<usize>,
    #[validate(nested)]
    retry: Option<RawRetry>,
    baseline_policy: Option<BaselinePolicy>,
    baseline_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Validate, Default)]
#[serde(deny_unknown_fields)]
struct RawRetry {
    #[validate(range(min = 1, max = 20))]
    max_attempts: Option<u32>,
    initial_backoff_ms: Option<u64>,
    max_backoff_ms: Option<u64>,
    #[validate(range(min = 1.0, max = 10.0))]
    multiplier: Option<f64>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
struct RawTable {
    #[validate(length(min = 1, message = "source cannot be empty"))]
    source: String,
    primary_key: Option<String>,
    #[serde(default)]
    not_null: Vec<String>,
    null_columns: Option<Vec<String>>,
    #[serde(default)]
    expected_types: BTreeMap<String, String>,
    min_rows: Option<u64>,
    max_rows: Option<u64>,
    #[serde(default)]
    thresholds: BTreeMap<CheckKind, RawThreshold>,
    #[serde(default)]
    checks: CheckToggles,
}

#[derive(Debug, Deserialize, Validate, Clone, Copy)]
#[serde(deny_unknown_fields)]
struct RawThreshold {
    #[validate(range(min = 0.0))]
    warn_pct: Option<f64>,
    #[validate(range(min = 0.0))]
    fail_pct: Option<f64>,
}

fn ratio(pct: Option<f64>) -> Option<f64> {
    pct.map(|p| p / 100.0)
}

impl From<RawThreshold> for ThresholdOverride {
    fn from(raw: RawThreshold) -> Self {
        ThresholdOverride::new(ratio(raw.warn_pct), ratio(raw.fail_pct))
    }
}

// --- RESOLVED CONFIG ---

#[derive(Debug, Clone, PartialEq)]
pub enum DatasourceConfig {
    DuckDB { path: PathBuf },
}

/// A loaded `vigil.yaml`, paths resolved against the project directory.
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    pub root: PathBuf,
    pub datasources: BTreeMap<String, DatasourceConfig>,
    pub tables: Vec<TableSpec>,
    pub settings: RunSettings,
    pub baseline_dir: PathBuf,
}

impl ProjectConfig {
    /// Parses and resolves a configuration document.
    ///
    /// `env` looks up environment overrides (`VIGIL_BASELINE_DIR`,
    /// `VIGIL_RUN_TIMEOUT_SECS`).
    pub fn from_yaml<E>(content: &str, root: &Path, env: E) -> Result<Self, InfrastructureError>
    where
        E: Fn(&str) -> Option<String>,
    {
        let mut raw: RawConfig = serde_yaml::from_str(content)?;
        apply_env_overrides(&mut raw, env)?;

        raw.validate()?;
        for table in raw.tables.values() {
            table.validate()?;
            for threshold in table.thresholds.values() {
                threshold.validate()?;
            }
        }

        Ok(resolve(raw, root))
    }

    pub fn build_datasources(&self) -> DatasourceRegistry {
        self.datasources
            .iter()
            .map(|(name, config)| {
                let datasource: Arc<dyn Datasource> = match config {
                    DatasourceConfig::DuckDB { path } => {
                        Arc::new(DuckDBDatasource::new(name.clone(), path.clone()))
                    }
                };
                (name.clone(), datasource)
            })
            .collect()
    }

    pub fn baseline_store(&self) -> JsonBaselineStore {
        JsonBaselineStore::new(self.baseline_dir.clone())
    }
}

fn absolute(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

fn resolve(raw: RawConfig, root: &Path) -> ProjectConfig {
    let project_null = ThresholdOverride::new(
        ratio(raw.defaults.null_warn_pct),
        ratio(raw.defaults.null_fail_pct),
    );
    let project_volume = ThresholdOverride::new(
        ratio(raw.defaults.volume_warn_pct),
        ratio(raw.defaults.volume_fail_pct),
    );

    let tables = raw
        .tables
        .into_iter()
        .map(|(name, table)| {
            let mut thresholds: BTreeMap<CheckKind, ThresholdOverride> = table
                .thresholds
                .into_iter()
                .map(|(kind, t)| (kind, ThresholdOverride::from(t)))
                .collect();

            // Project defaults sit under per-table overrides.
            for (kind, project) in [
                (CheckKind::NullRate, project_null),
                (CheckKind::RowCountChange, project_volume),
            ] {
                let layered = thresholds.get(&kind).copied().unwrap_or_default().over(project);
                if !layered.is_empty() {
                    thresholds.insert(kind, layered);
                }
            }

            TableSpec {
                table: name,
                source: table.source,
                primary_key: table.primary_key,
                required_columns: table.not_null,
                null_rate_columns: table.null_columns,
                expected_types: table.expected_types,
                min_rows: table.min_rows,
                max_rows: table.max_rows,
                thresholds,
                checks: table.checks,
            }
        })
        .collect();

    let defaults = RunSettings::default();
    let retry = raw.run.retry.unwrap_or_default();
    let retry_defaults = RetryPolicy::default();
    let settings = RunSettings {
        query_timeout: raw
            .run
            .query_timeout_secs
            .map_or(defaults.query_timeout, Duration::from_secs),
        run_timeout: raw.run.run_timeout_secs.map(Duration::from_secs),
        max_concurrent_queries: raw
            .run
            .max_concurrent_queries
            .unwrap_or(defaults.max_concurrent_queries),
        max_concurrent_tables: raw
            .run
            .max_concurrent_tables
            .unwrap_or(defaults.max_concurrent_tables),
        retry: RetryPolicy {
            max_attempts: retry.max_attempts.unwrap_or(retry_defaults.max_attempts),
            initial_backoff: retry
                .initial_backoff_ms
                .map_or(retry_defaults.initial_backoff, Duration::from_millis),
            multiplier: retry.multiplier.unwrap_or(retry_defaults.multiplier),
            max_backoff: retry
                .max_backoff_ms
                .map_or(retry_defaults.max_backoff, Duration::from_millis),
        },
        baseline_policy: raw.run.baseline_policy.unwrap_or_default(),
    };

    let datasources = raw
        .datasources
        .into_iter()
        .map(|(name, ds)| match ds {
            RawDatasource::Duckdb { path } => (
                name,
                DatasourceConfig::DuckDB {
                    path: absolute(root, &path),
                },
            ),
        })
        .collect();

    let baseline_dir = absolute(
        root,
        &raw.run
            .baseline_dir
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BASELINE_DIR)),
    );

    ProjectConfig {
        root: root.to_path_buf(),
        datasources,
        tables,
        settings,
        baseline_dir,
    }
}

// --- LOADER ---

#[instrument(skip(project_dir, explicit))] // Log automatique de l'entrée/sortie de la fonction
pub fn load_project_config(
    project_dir: &Path,
    explicit: Option<&Path>,
) -> Result<ProjectConfig, InfrastructureError> {
    let config_path = match explicit {
        Some(path) => {
            let path = absolute(project_dir, path);
            if !path.exists() {
                return Err(InfrastructureError::ConfigNotFound(
                    path.display().to_string(),
                ));
            }
            path
        }
        None => find_main_config(project_dir)?,
    };
    info!(path = ?config_path, "Loading project configuration");

    let content = fs::read_to_string(&config_path)?;
    let config = ProjectConfig::from_yaml(&content, project_dir, |key| std::env::var(key).ok())?;

    info!(
        tables = config.tables.len(),
        datasources = config.datasources.len(),
        "Configuration loaded"
    );
    Ok(config)
}

pub fn find_main_config(root: &Path) -> Result<PathBuf, InfrastructureError> {
    for filename in CONFIG_CANDIDATES {
        let p = root.join(filename);
        if p.exists() {
            return Ok(p);
        }
    }
    Err(InfrastructureError::ConfigNotFound(format!(
        "{} (checked {:?})",
        root.display(),
        CONFIG_CANDIDATES
    )))
}

// Permet de faire: VIGIL_RUN_TIMEOUT_SECS=120 vigil run
fn apply_env_overrides<E>(raw: &mut RawConfig, env: E) -> Result<(), InfrastructureError>
where
    E: Fn(&str) -> Option<String>,
{
    if let Some(dir) = env("VIGIL_BASELINE_DIR") {
        info!(new = ?dir, "Overriding baseline directory via ENV");
        raw.run.baseline_dir = Some(PathBuf::from(dir));
    }
    if let Some(val) = env("VIGIL_RUN_TIMEOUT_SECS") {
        let secs = val.trim().parse::<u64>().map_err(|_| {
            InfrastructureError::ConfigError(format!(
                "VIGIL_RUN_TIMEOUT_SECS must be a number of seconds, got '{val}'"
            ))
        })?;
        info!(secs, "Overriding run timeout via ENV");
        raw.run.run_timeout_secs = Some(secs);
    }
    Ok(())
}

/// Starter file written by `vigil init`.
pub const STARTER_CONFIG: &str = r#"# vigil.yaml
datasources:
  warehouse:
    type: duckdb
    path: warehouse.duckdb

defaults:
  null_warn_pct: 10
  null_fail_pct: 25
  volume_warn_pct: 20
  volume_fail_pct: 40

run:
  query_timeout_secs: 30
  max_concurrent_queries: 4
  max_concurrent_tables: 4
  retry:
    max_attempts: 3
    initial_backoff_ms: 200
    max_backoff_ms: 5000
    multiplier: 2.0
  baseline_policy: always

tables:
  orders:
    source: warehouse
    primary_key: order_id
    not_null: [order_id, customer_id]
"#;
