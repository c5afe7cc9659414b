//! Output formatting for monthly summaries.
//!
//! Two formats are supported:
//! - **TTY**: the "Resumo Mensal" text report, one block per month
//! - **JSON**: the month summary array, pretty-printed

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::summary::MonthSummary;

/// The output format for summary display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Human-readable terminal output.
    #[default]
    Tty,
    /// Machine-readable JSON output.
    Json,
}

/// Formats a minute count for display.
///
/// Under an hour this is `"N minutos"`; otherwise `"Hh Mmin"` with whole
/// hours and the remaining minutes rounded.
pub fn format_minutes(minutes: f64) -> String {
    if minutes < 60.0 {
        return format!("{} minutos", whole(minutes));
    }
    let hours = (minutes / 60.0).floor();
    let rest = minutes % 60.0;
    format!("{}h {}min", whole(hours), whole(rest))
}

/// Rounds to an integer for display, folding `-0` into `0`.
fn whole(value: f64) -> f64 {
    value.round() + 0.0
}

/// Renders month summaries in the given format.
pub fn render_summary(
    summaries: &[MonthSummary],
    format: OutputFormat,
) -> serde_json::Result<String> {
    match format {
        OutputFormat::Tty => Ok(render_tty(summaries)),
        OutputFormat::Json => serde_json::to_string_pretty(summaries),
    }
}

fn render_tty(summaries: &[MonthSummary]) -> String {
    let mut out = String::from("Resumo Mensal\n");

    if summaries.is_empty() {
        out.push_str("\nNenhum evento encontrado.");
        return out;
    }

    for month in summaries {
        let _ = write!(out, "\nMês: {}\n", month.month);
        for (task, totals) in month.tasks.iter() {
            let title = if task.is_empty() { "(sem título)" } else { task };
            let _ = writeln!(out, "  {title}");
            let _ = writeln!(out, "    Tempo total: {}", format_minutes(totals.total_time));
            let _ = writeln!(out, "    Realizado: {} vezes", totals.count);
        }
    }

    out.truncate(out.trim_end().len());
    out
}
