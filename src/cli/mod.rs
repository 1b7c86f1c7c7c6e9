//! CLI command definitions and handlers

mod analyze;
mod deps;
mod init;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parse and validate workers count (1-64)
fn parse_workers(s: &str) -> Result<usize, String> {
    let n: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if n == 0 {
        Err("workers must be at least 1".to_string())
    } else if n > 64 {
        Err("workers cannot exceed 64".to_string())
    } else {
        Ok(n)
    }
}

/// Parse a score threshold (0-100)
fn parse_score(s: &str) -> Result<f64, String> {
    let score: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid score", s))?;
    if (0.0..=100.0).contains(&score) {
        Ok(score)
    } else {
        Err("score must be between 0 and 100".to_string())
    }
}

/// homediag - Home-automation health diagnostics
///
/// Reads exported telemetry snapshots and reports on entities, batteries,
/// logs, updates, the Zigbee mesh, automations and energy use.
#[derive(Parser, Debug)]
#[command(name = "homediag")]
#[command(
    version,
    about = "Health diagnostics for home-automation telemetry snapshots",
    long_about = "homediag scores a home-automation installation from an exported telemetry \
snapshot: unavailable entities, low batteries, log errors, pending updates, Zigbee mesh \
link quality, orphan entities, contradictory or looping automations and energy use.\n\n\
Everything runs locally on the snapshot file; no hub connection is made.",
    after_help = "\
Examples:
  homediag analyze snapshot.json                     Text report for one snapshot
  homediag analyze snapshot.json --format json       JSON output for scripting
  homediag analyze monday.json tuesday.json          Report on tuesday with a trend
  homediag analyze snapshot.json --fail-below 70     Exit code 1 when the score drops below 70
  homediag deps snapshot.json light.hall             What references light.hall
  homediag init                                      Write an example homediag.toml"
)]
pub struct Cli {
    /// Log level used when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    /// Number of parallel analyzer workers (1-64, default: auto)
    #[arg(long, global = true, value_parser = parse_workers)]
    pub workers: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze one or more telemetry snapshots
    ///
    /// Snapshots are analyzed in the order given; the report shows the last
    /// one together with its score trend.
    Analyze {
        /// Snapshot JSON files
        #[arg(required = true)]
        snapshots: Vec<PathBuf>,

        /// Config file (default: homediag.toml or .homediagrc.json in the current directory)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Output format: text, json, markdown (or md)
        #[arg(long, short = 'f', value_parser = ["text", "json", "markdown", "md"])]
        format: Option<String>,

        /// Output file path (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Exit with code 1 when the health score is below this value
        #[arg(long, value_parser = parse_score)]
        fail_below: Option<f64>,
    },

    /// Show which automations, scripts and dashboards reference entities
    Deps {
        /// Snapshot JSON file
        snapshot: PathBuf,

        /// Entity ids to look up (default: every entity in the snapshot)
        entities: Vec<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Write an example homediag.toml config file
    Init {
        /// Directory to write the config into
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

/// Run the CLI with parsed arguments
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Analyze {
            snapshots,
            config,
            format,
            output,
            fail_below,
        } => analyze::run(analyze::AnalyzeOptions {
            snapshots,
            config,
            format,
            output,
            fail_below,
            workers: cli.workers,
        }),

        Commands::Deps {
            snapshot,
            entities,
            json,
        } => deps::run(&snapshot, &entities, json),

        Commands::Init { path } => init::run(&path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_analyze() {
        let cli = Cli::try_parse_from([
            "homediag",
            "--workers",
            "4",
            "analyze",
            "a.json",
            "b.json",
            "--format",
            "json",
            "--fail-below",
            "70",
        ])
        .unwrap();
        assert_eq!(cli.workers, Some(4));
        match cli.command {
            Commands::Analyze {
                snapshots,
                format,
                fail_below,
                ..
            } => {
                assert_eq!(snapshots.len(), 2);
                assert_eq!(format.as_deref(), Some("json"));
                assert_eq!(fail_below, Some(70.0));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_deps() {
        let cli = Cli::try_parse_from(["homediag", "deps", "s.json", "light.a", "light.b", "--json"]).unwrap();
        match cli.command {
            Commands::Deps {
                snapshot,
                entities,
                json,
            } => {
                assert_eq!(snapshot, PathBuf::from("s.json"));
                assert_eq!(entities, vec!["light.a", "light.b"]);
                assert!(json);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_analyze_requires_snapshot() {
        assert!(Cli::try_parse_from(["homediag", "analyze"]).is_err());
    }

    #[test]
    fn test_parse_workers() {
        assert_eq!(parse_workers("8"), Ok(8));
        assert!(parse_workers("0").is_err());
        assert!(parse_workers("65").is_err());
        assert!(parse_workers("many").is_err());
    }

    #[test]
    fn test_parse_score() {
        assert_eq!(parse_score("72.5"), Ok(72.5));
        assert!(parse_score("101").is_err());
        assert!(parse_score("-1").is_err());
    }
}
