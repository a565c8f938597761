// vigil/src/report.rs
//
// Rendering of a RunResult. The engine never prints; everything user-facing
// on stdout comes from here.

use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Table};
use std::fmt::Write;

use vigil_core::domain::quality::{BaselineOutcome, RunResult, Status};

use crate::cli::OutputFormat;

pub fn render(result: &RunResult, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Human => Ok(human(result)),
        OutputFormat::Quiet => Ok(quiet(result)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(result)?),
    }
}

fn status_cell(status: Status) -> Cell {
    let (label, color) = match status {
        Status::Pass => ("✅ PASS", Color::Green),
        Status::Warn => ("⚠️  WARN", Color::Yellow),
        Status::Fail => ("❌ FAIL", Color::Red),
        Status::Error => ("💥 ERROR", Color::Magenta),
    };
    Cell::new(label).fg(color)
}

fn human(result: &RunResult) -> String {
    let mut out = String::new();

    for table in &result.tables {
        let _ = writeln!(
            out,
            "\n📋 {} ({}) {}",
            table.table, table.source, table.status
        );

        let mut grid = Table::new();
        grid.load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["Check", "Status", "Message"]);
        for check in &table.checks {
            grid.add_row(vec![
                Cell::new(&check.id),
                status_cell(check.status),
                Cell::new(&check.message),
            ]);
        }
        let _ = writeln!(out, "{grid}");

        for check in table.checks.iter().filter(|c| c.status > Status::Pass) {
            if let Some(hint) = &check.hint {
                let _ = writeln!(out, "   👉 {}: {}", check.id, hint);
            }
        }

        match &table.baseline {
            BaselineOutcome::Written => {
                let _ = writeln!(out, "   💾 Baseline updated");
            }
            BaselineOutcome::Skipped(reason) => {
                let _ = writeln!(out, "   ⏭️  Baseline not updated: {reason}");
            }
            BaselineOutcome::Failed(reason) => {
                let _ = writeln!(out, "   ❗ Baseline write failed: {reason}");
            }
        }
    }

    let totals = &result.totals;
    let _ = writeln!(
        out,
        "\n{} {} checks on {} table(s): {} passed, {} warned, {} failed, {} errored in {}ms",
        match result.status {
            Status::Pass => "✨",
            Status::Warn => "⚠️ ",
            Status::Fail => "❌",
            Status::Error => "💥",
        },
        totals.checks,
        totals.tables,
        totals.passed,
        totals.warned,
        totals.failed,
        totals.errored,
        result.elapsed_ms
    );
    out
}

fn quiet(result: &RunResult) -> String {
    let mut out = String::new();
    for table in &result.tables {
        for check in table.checks.iter().filter(|c| c.status > Status::Pass) {
            let _ = writeln!(
                out,
                "{:<5} {} {}: {}",
                check.status.as_str(),
                table.table,
                check.id,
                check.message
            );
        }
    }
    out
}
