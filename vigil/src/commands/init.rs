// vigil/src/commands/init.rs
//
// USE CASE: Scaffold a vigil.yaml.

use std::path::PathBuf;

use anyhow::Context;
use vigil_core::infrastructure::config::STARTER_CONFIG;

pub fn execute(project_dir: PathBuf, force: bool) -> anyhow::Result<i32> {
    let path = project_dir.join("vigil.yaml");
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    std::fs::create_dir_all(&project_dir)
        .with_context(|| format!("Failed to create {}", project_dir.display()))?;
    std::fs::write(&path, STARTER_CONFIG)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("✨ Created {}", path.display());
    println!("👉 Point `datasources.warehouse.path` at your DuckDB file, then run `vigil run`.");
    Ok(0)
}
