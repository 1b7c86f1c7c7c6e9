//! Analyze command - run diagnostics over snapshot files

use anyhow::{Context, Result};
use console::style;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

use crate::config::{load_config_file, load_project_config, DiagnosticsConfig};
use crate::pipeline::{DiagnosticRun, DiagnosticsService};
use crate::reporters::{self, OutputFormat};
use crate::telemetry::load_snapshot;

/// Arguments of `homediag analyze` after clap parsing
#[derive(Debug)]
pub struct AnalyzeOptions {
    pub snapshots: Vec<PathBuf>,
    pub config: Option<PathBuf>,
    pub format: Option<String>,
    pub output: Option<PathBuf>,
    pub fail_below: Option<f64>,
    pub workers: Option<usize>,
}

/// Run the analyze command
pub fn run(opts: AnalyzeOptions) -> Result<()> {
    let config = resolve_config(opts.config.as_deref())?;

    // Flags win over [defaults] in the config file
    let format = match opts.format.or_else(|| config.defaults.format.clone()) {
        Some(name) => OutputFormat::from_str(&name)?,
        None => OutputFormat::Text,
    };
    let workers = opts.workers.or(config.defaults.workers).unwrap_or(0);
    debug!(
        "Format {}, workers {}, capabilities {:?}",
        format,
        workers,
        config.enabled_capabilities()
    );

    let mut service = DiagnosticsService::from_config(config).with_workers(workers);
    let mut last_run: Option<DiagnosticRun> = None;
    for path in &opts.snapshots {
        let snapshot = load_snapshot(path)
            .with_context(|| format!("Failed to load snapshot {}", path.display()))?;
        info!(
            "Analyzing {} (captured {}, {} entities)",
            path.display(),
            snapshot.captured_at,
            snapshot.entities.len()
        );
        last_run = Some(service.diagnose(&snapshot)?);
    }
    let run = last_run.context("No snapshot given")?;

    let output = reporters::report_with_format(&run, service.history(), format)?;
    write_output(&output, opts.output.as_deref())?;

    check_fail_below(opts.fail_below, run.report.overall_score);
    Ok(())
}

/// Explicit config files must load; auto-discovered ones fall back to defaults
fn resolve_config(explicit: Option<&Path>) -> Result<DiagnosticsConfig> {
    match explicit {
        Some(path) => Ok(load_config_file(path)?),
        None => {
            let cwd = std::env::current_dir().context("Failed to read current directory")?;
            Ok(load_project_config(&cwd))
        }
    }
}

fn write_output(output: &str, output_path: Option<&Path>) -> Result<()> {
    match output_path {
        Some(path) => {
            std::fs::write(path, output)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            // stderr keeps stdout clean for piping
            eprintln!(
                "{} Report written to: {}",
                style("📄").bold(),
                style(path.display()).cyan()
            );
        }
        None => {
            print!("{}", output);
            if !output.ends_with('\n') {
                println!();
            }
        }
    }
    Ok(())
}

/// Exit with code 1 when the score is below the threshold
fn check_fail_below(fail_below: Option<f64>, score: f64) {
    if let Some(threshold) = fail_below {
        if score < threshold {
            eprintln!(
                "Failing due to --fail-below={}: health score is {:.1}",
                threshold, score
            );
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_explicit_config_errors_are_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[mesh\nweak_lqi_threshold = ").unwrap();
        assert!(resolve_config(Some(&path)).is_err());
        assert!(resolve_config(Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn test_explicit_config_is_used() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("homediag.toml");
        std::fs::write(&path, "[energy]\ncost_per_kwh = 0.30\n").unwrap();
        let config = resolve_config(Some(&path)).unwrap();
        assert_eq!(config.energy.cost_per_kwh, 0.30);
    }

    #[test]
    fn test_write_output_to_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.md");
        write_output("# Home Health Report\n", Some(&path)).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "# Home Health Report\n"
        );
    }
}
