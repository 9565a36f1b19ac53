//! Presentation of finished probe runs. Nothing here touches the network.

pub mod console;
pub mod github;
pub mod markdown;
pub mod table;

use std::str::FromStr;

use serde::Serialize;

use crate::result::{ModelProbeResult, ProbeSummary};

/// Output format for the command-line report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    #[default]
    Console,
    Markdown,
    Json,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "console" | "text" => Ok(Self::Console),
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            other => Err(format!(
                "unknown format '{other}' (expected console, markdown or json)"
            )),
        }
    }
}

pub fn render(format: ReportFormat, results: &[ModelProbeResult]) -> String {
    match format {
        ReportFormat::Console => console::render(results),
        ReportFormat::Markdown => markdown::render(results),
        ReportFormat::Json => render_json(results),
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    summary: ProbeSummary,
    results: &'a [ModelProbeResult],
}

pub fn render_json(results: &[ModelProbeResult]) -> String {
    let report = JsonReport {
        summary: ProbeSummary::from_results(results),
        results,
    };
    match serde_json::to_string_pretty(&report) {
        Ok(json) => json,
        Err(e) => {
            let escaped = e.to_string().replace('\\', "\\\\").replace('"', "\\\"");
            format!(r#"{{"error":"serialization failed: {escaped}"}}"#)
        }
    }
}

/// Shorten a status for a table cell: unchanged up to `max_chars`, otherwise
/// cut to `max_chars - 3` characters plus `...`.
pub fn truncate_status(status: &str, max_chars: usize) -> String {
    if status.chars().count() <= max_chars {
        return status.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = status.chars().take(keep).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_status_is_untouched() {
        assert_eq!(truncate_status("Success", 50), "Success");
    }

    #[test]
    fn long_status_is_cut_with_ellipsis() {
        let status = "HTTP 429: rate limited, please slow down your requests";
        let cut = truncate_status(status, 20);
        assert_eq!(cut, "HTTP 429: rate li...");
        assert_eq!(cut.chars().count(), 20);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let cut = truncate_status("ошибка соединения с сервером", 10);
        assert_eq!(cut, "ошибка ...");
    }

    #[test]
    fn format_parses_aliases() {
        assert_eq!("md".parse::<ReportFormat>(), Ok(ReportFormat::Markdown));
        assert!("xml".parse::<ReportFormat>().is_err());
    }
}
