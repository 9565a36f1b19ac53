//! GitHub Actions step outputs.

use std::io::Write;
use std::path::Path;

use crate::error::ProbeError;
use crate::result::ProbeSummary;

/// `key=value` lines in the order the workflow reads them.
pub fn output_lines(summary: &ProbeSummary) -> String {
    format!(
        "available_count={}\nunavailable_count={}\ntotal_count={}\n",
        summary.available_count, summary.unavailable_count, summary.total
    )
}

/// Append the counts to the file named by `GITHUB_OUTPUT`.
pub fn write_outputs(path: &Path, summary: &ProbeSummary) -> Result<(), ProbeError> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    file.write_all(output_lines(summary).as_bytes())?;
    tracing::debug!(path = %path.display(), "wrote GitHub Actions outputs");
    Ok(())
}

/// Output file to write, if running under GitHub Actions.
pub fn output_path_from_env() -> Option<std::path::PathBuf> {
    std::env::var_os("GITHUB_ACTIONS")?;
    std::env::var_os("GITHUB_OUTPUT")
        .filter(|p| !p.is_empty())
        .map(std::path::PathBuf::from)
}
