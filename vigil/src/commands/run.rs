// vigil/src/commands/run.rs
//
// USE CASE: Run every configured check and report.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use vigil_core::VigilError;
use vigil_core::application::Orchestrator;
use vigil_core::domain::project::BaselinePolicy;
use vigil_core::infrastructure::config::load_project_config;

use crate::cli::OutputFormat;
use crate::report;

/// Returns the process exit code of the run.
pub async fn execute(
    project_dir: PathBuf,
    config: Option<PathBuf>,
    dry_run: bool,
    format: OutputFormat,
) -> anyhow::Result<i32> {
    // A. Load the Config (Infra)
    let mut config =
        load_project_config(&project_dir, config.as_deref()).map_err(VigilError::from)?;
    if dry_run {
        config.settings.baseline_policy = BaselinePolicy::Never;
    }
    debug!(
        tables = config.tables.len(),
        policy = ?config.settings.baseline_policy,
        "Configuration ready"
    );

    // B. Wire the adapters (dependency injection)
    let store = Arc::new(config.baseline_store());
    let orchestrator = Orchestrator::new(config.build_datasources(), store, config.settings.clone());

    // C. Run (Application Layer)
    let result = orchestrator.run(&config.tables).await?;

    print!("{}", report::render(&result, format)?);
    if dry_run && format == OutputFormat::Human {
        println!("🧪 Dry run: baselines were not written.");
    }

    Ok(result.exit_code())
}
