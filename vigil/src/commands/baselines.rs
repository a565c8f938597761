// vigil/src/commands/baselines.rs
//
// USE CASE: Inspect and reset stored baselines.

use std::path::PathBuf;

use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use vigil_core::VigilError;
use vigil_core::infrastructure::config::load_project_config;

pub fn list(project_dir: PathBuf, config: Option<PathBuf>) -> anyhow::Result<i32> {
    let config = load_project_config(&project_dir, config.as_deref()).map_err(VigilError::from)?;
    let store = config.baseline_store();
    let snapshots = store.list()?;

    if snapshots.is_empty() {
        println!("📭 No baselines in {}", store.dir().display());
        return Ok(0);
    }

    let mut grid = Table::new();
    grid.load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Table", "Rows", "Columns", "Runs", "Captured at"]);
    for snapshot in &snapshots {
        grid.add_row(vec![
            snapshot.table.clone(),
            snapshot.row_count.to_string(),
            snapshot.columns.len().to_string(),
            snapshot.run_count.to_string(),
            snapshot.captured_at.to_rfc3339(),
        ]);
    }
    println!("📸 Baselines in {}", store.dir().display());
    println!("{grid}");
    Ok(0)
}

pub fn reset(table: String, project_dir: PathBuf, config: Option<PathBuf>) -> anyhow::Result<i32> {
    let config = load_project_config(&project_dir, config.as_deref()).map_err(VigilError::from)?;
    let store = config.baseline_store();

    if store.delete(&table)? {
        println!("🗑️  Baseline for '{table}' deleted");
    } else {
        println!("📭 No baseline stored for '{table}'");
    }
    Ok(0)
}
