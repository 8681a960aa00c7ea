//! Output formats for CLI payloads on stdout.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use dm_report::ReportSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Pretty-printed JSON (default)
    #[default]
    Json,

    /// One `suite: counts` line per suite
    Summary,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Summary => write!(f, "summary"),
        }
    }
}

/// Format seconds as `H:MM:SS.mmm`.
pub fn format_elapsed(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms / 60_000) % 60;
    let secs = (total_ms / 1000) % 60;
    let millis = total_ms % 1000;
    format!("{hours}:{minutes:02}:{secs:02}.{millis:03}")
}

/// `name: {counts}` lines, the aggregate last.
pub fn summary_lines(summary: &ReportSummary) -> Vec<String> {
    let mut lines: Vec<String> = summary
        .suites
        .iter()
        .map(|(name, record)| {
            format!(
                "{}: {}",
                name,
                serde_json::to_string(record).unwrap_or_default()
            )
        })
        .collect();
    lines.push(format!(
        "{}: {}",
        dm_report::SUMMARY_KEY,
        serde_json::to_string(&summary.aggregate).unwrap_or_default()
    ));
    lines
}
