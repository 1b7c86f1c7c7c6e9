//! Output reporters for diagnostic runs
//!
//! Supports multiple output formats:
//! - `text` - Terminal output with colors
//! - `json` - Machine-readable JSON
//! - `markdown` - GitHub-flavored Markdown

mod json;
mod markdown;
mod text;

use crate::history::SnapshotHistory;
use crate::pipeline::DiagnosticRun;
use anyhow::{anyhow, Result};
use std::str::FromStr;

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Markdown,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" | "terminal" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            _ => Err(anyhow!(
                "Unknown format '{}'. Valid formats: text, json, markdown",
                s
            )),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

/// Render a run in the specified format
pub fn report(run: &DiagnosticRun, history: &SnapshotHistory, format: &str) -> Result<String> {
    let fmt = OutputFormat::from_str(format)?;
    report_with_format(run, history, fmt)
}

/// Render a run using an OutputFormat enum.
///
/// The history supplies the score trend for the human-readable formats;
/// JSON carries only the run itself.
pub fn report_with_format(run: &DiagnosticRun, history: &SnapshotHistory, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => text::render(run, history),
        OutputFormat::Json => json::render(run),
        OutputFormat::Markdown => markdown::render(run, history),
    }
}

/// Get the recommended file extension for a format
pub fn file_extension(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::Text => "txt",
        OutputFormat::Json => "json",
        OutputFormat::Markdown => "md",
    }
}

/// First `limit` items joined, with a "+N more" tail
pub(crate) fn truncated_list(items: &[String], limit: usize) -> String {
    let shown: Vec<&str> = items.iter().take(limit).map(String::as_str).collect();
    let mut out = shown.join(", ");
    if items.len() > limit {
        out.push_str(&format!(" (+{} more)", items.len() - limit));
    }
    out
}
