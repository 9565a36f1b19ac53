use std::fmt::Write;

use crate::result::{ModelProbeResult, ProbeSummary};

const RULE_WIDTH: usize = 60;

/// Plain-text report: counts, then available and unavailable models.
pub fn render(results: &[ModelProbeResult]) -> String {
    let summary = ProbeSummary::from_results(results);
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();

    // Writing into a String cannot fail.
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "MODEL AVAILABILITY TEST RESULTS");
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out);
    let _ = writeln!(out, "Total models tested: {}", summary.total);
    let _ = writeln!(out, "Available models: {}", summary.available_count);
    let _ = writeln!(out, "Unavailable models: {}", summary.unavailable_count);

    let (available, unavailable): (Vec<&ModelProbeResult>, Vec<&ModelProbeResult>) =
        results.iter().partition(|r| r.is_available());

    if !available.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "✓ AVAILABLE MODELS:");
        for r in &available {
            let _ = writeln!(out, "  - {} ({:.2}s)", r.model_id, r.response_time_seconds);
        }
    }

    if !unavailable.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "✗ UNAVAILABLE MODELS:");
        for r in &unavailable {
            let _ = writeln!(out, "  - {}: {}", r.model_id, r.status_message);
        }
    }

    if summary.wrong_model_count > 0 {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "⚠ {} model(s) answered under a different name; check endpoint routing",
            summary.wrong_model_count
        );
    }

    let _ = writeln!(out);
    let _ = write!(out, "{rule}");
    out
}
