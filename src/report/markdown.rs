use std::fmt::Write;

use crate::report::table::{Alignment, MarkdownTable};
use crate::report::truncate_status;
use crate::result::{ModelProbeResult, ProbeSummary, working_by_speed};

/// Max characters of a status message shown in a table cell.
pub const STATUS_CELL_CHARS: usize = 50;

pub fn results_table(results: &[ModelProbeResult]) -> MarkdownTable {
    let mut table = MarkdownTable::new(["Model", "Actual Model", "Status", "Time", "Working"])
        .with_alignments(&[
            Alignment::Left,
            Alignment::Left,
            Alignment::Left,
            Alignment::Right,
            Alignment::Center,
        ]);
    for r in results {
        table.push_row([
            r.model_id.clone(),
            r.actual_model_id.clone().unwrap_or_else(|| "N/A".to_string()),
            truncate_status(&r.status_message, STATUS_CELL_CHARS),
            format!("{:.2}", r.response_time_seconds),
            if r.is_available() { "🟩" } else { "🟥" }.to_string(),
        ]);
    }
    table
}

/// Results table, totals, and the working models fastest first.
pub fn render(results: &[ModelProbeResult]) -> String {
    let summary = ProbeSummary::from_results(results);
    let mut out = String::new();

    // Writing into a String cannot fail.
    let _ = writeln!(out, "Test Results:");
    let _ = writeln!(out, "{}", results_table(results).render());
    let _ = writeln!(out);
    let _ = writeln!(out, "Total tested: {} models", summary.total);
    let _ = writeln!(out, "Successful responses: {}", summary.available_count);
    let _ = write!(
        out,
        "Total testing time: {:.2} sec",
        summary.total_time_seconds
    );

    let working = working_by_speed(results);
    if !working.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out);
        let _ = write!(out, "Working models (sorted by speed):");
        for r in working {
            let _ = write!(out, "\n- {}: {:.2} sec", r.model_id, r.response_time_seconds);
        }
    }
    out
}
