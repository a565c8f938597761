// vigil/src/main.rs

mod cli;
mod commands;
mod report;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use vigil_core::VigilError;

use crate::cli::{Cli, Commands};

/// Operational errors (configuration, IO) exit with 3, like an unreachable datasource.
const EXIT_OPERATIONAL: i32 = 3;

async fn dispatch(command: Commands) -> anyhow::Result<i32> {
    match command {
        // --- USE CASE: RUN CHECKS ---
        Commands::Run {
            project_dir,
            config,
            dry_run,
            format,
        } => commands::run::execute(project_dir, config, dry_run, format).await,

        // --- USE CASE: SCAFFOLDING ---
        Commands::Init { project_dir, force } => commands::init::execute(project_dir, force),

        // --- USE CASE: BASELINES ---
        Commands::Baselines {
            project_dir,
            config,
        } => commands::baselines::list(project_dir, config),
        Commands::Reset {
            table,
            project_dir,
            config,
        } => commands::baselines::reset(table, project_dir, config),
    }
}

#[tokio::main]
async fn main() {
    // 1. Setup Logging (Tracing) on stderr; stdout is for the report.
    // RUST_LOG=debug vigil run ... pour voir les détails
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let code = match dispatch(cli.command).await {
        Ok(code) => code,
        Err(err) => {
            match err.downcast::<VigilError>() {
                Ok(vigil) => eprintln!("{:?}", miette::Report::new(vigil)),
                Err(other) => eprintln!("💥 {other:#}"),
            }
            EXIT_OPERATIONAL
        }
    };

    std::process::exit(code);
}
