// vigil/src/cli.rs
//
// Single source of truth for all CLI definitions (Clap structs).

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vigil")]
#[command(about = "Data quality checks with drift baselines and CI-friendly exit codes", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table per check, with a summary
    Human,
    /// Only non-passing checks, one per line
    Quiet,
    /// The full run result as JSON
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 🚀 Runs every configured check (exit 0 pass, 1 warn, 2 fail, 3 error)
    Run {
        /// Project directory
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,

        /// Configuration file (default: vigil.yaml in the project directory)
        #[arg(long, short, env = "VIGIL_CONFIG")]
        config: Option<PathBuf>,

        /// Run the checks without writing baselines
        #[arg(long)]
        dry_run: bool,

        /// Output format
        #[arg(long, short, value_enum, default_value_t = OutputFormat::Human)]
        format: OutputFormat,
    },

    /// ✨ Writes a starter vigil.yaml
    Init {
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,

        /// Overwrite an existing vigil.yaml
        #[arg(long)]
        force: bool,
    },

    /// 📸 Lists the stored baselines
    Baselines {
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,

        #[arg(long, short, env = "VIGIL_CONFIG")]
        config: Option<PathBuf>,
    },

    /// 🗑️  Deletes the baseline of a table (the next run starts fresh)
    Reset {
        /// Table whose baseline is removed
        table: String,

        #[arg(long, default_value = ".")]
        project_dir: PathBuf,

        #[arg(long, short, env = "VIGIL_CONFIG")]
        config: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, bail};
    use clap::Parser;

    #[test]
    fn test_cli_parse_run_defaults() -> Result<()> {
        let args = Cli::try_parse_from(["vigil", "run"])?;
        match args.command {
            Commands::Run {
                project_dir,
                dry_run,
                format,
                ..
            } => {
                assert_eq!(project_dir.to_string_lossy(), ".");
                assert!(!dry_run);
                assert_eq!(format, OutputFormat::Human);
                Ok(())
            }
            _ => bail!("Expected Run command"),
        }
    }

    #[test]
    fn test_cli_parse_run_options() -> Result<()> {
        let args = Cli::try_parse_from([
            "vigil",
            "run",
            "--project-dir",
            "/tmp",
            "--config",
            "ci.yaml",
            "--dry-run",
            "--format",
            "json",
        ])?;
        match args.command {
            Commands::Run {
                project_dir,
                config,
                dry_run,
                format,
            } => {
                assert_eq!(project_dir.to_string_lossy(), "/tmp");
                assert_eq!(config, Some(PathBuf::from("ci.yaml")));
                assert!(dry_run);
                assert_eq!(format, OutputFormat::Json);
                Ok(())
            }
            _ => bail!("Expected Run command"),
        }
    }

    #[test]
    fn test_cli_parse_reset() -> Result<()> {
        let args = Cli::try_parse_from(["vigil", "reset", "orders"])?;
        match args.command {
            Commands::Reset { table, .. } => {
                assert_eq!(table, "orders");
                Ok(())
            }
            _ => bail!("Expected Reset command"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["vigil", "run", "--format", "xml"]).is_err());
    }
}
