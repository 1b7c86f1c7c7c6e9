//! homediag - Home-automation health diagnostics
//!
//! Turns an exported telemetry snapshot (entities, devices, Zigbee neighbor
//! tables, automations, energy samples, logs and updates) into a weighted
//! health report plus per-analyzer details.
//!
//! ```ignore
//! use homediag::config::DiagnosticsConfig;
//! use homediag::pipeline::run_diagnostics;
//! use homediag::telemetry::load_snapshot;
//!
//! let snapshot = load_snapshot(Path::new("snapshot.json"))?;
//! let run = run_diagnostics(&snapshot, &DiagnosticsConfig::default(), 0)?;
//! println!("{} ({})", run.report.overall_score, run.report.overall_label);
//! ```

pub mod cli;
pub mod config;
pub mod detectors;
pub mod history;
pub mod models;
pub mod pipeline;
pub mod reporters;
pub mod scoring;
pub mod telemetry;
