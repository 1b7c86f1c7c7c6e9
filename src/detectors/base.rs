//! Base detector trait and types
//!
//! This module defines the core abstractions for snapshot analysis:
//! - `Detector` trait that every analyzer implements
//! - `DetectorOutput` for findings plus an optional detail payload
//! - `DetectorResult` for capturing execution results

use crate::detectors::automation_conflicts::ConflictReport;
use crate::detectors::energy::EnergyReport;
use crate::detectors::mesh::MeshStats;
use crate::detectors::orphan_entities::OrphanReport;
use crate::models::{Category, Finding, Severity};
use crate::telemetry::Snapshot;
use anyhow::Result;
use std::collections::HashMap;

/// Structured side output of an analyzer, kept next to its findings
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisDetail {
    Mesh(MeshStats),
    Orphans(OrphanReport),
    Conflicts(ConflictReport),
    Energy(EnergyReport),
}

/// What a detector returns when it runs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectorOutput {
    pub findings: Vec<Finding>,
    pub detail: Option<AnalysisDetail>,
}

impl DetectorOutput {
    pub fn findings(findings: Vec<Finding>) -> Self {
        Self {
            findings,
            detail: None,
        }
    }

    pub fn with_detail(findings: Vec<Finding>, detail: AnalysisDetail) -> Self {
        Self {
            findings,
            detail: Some(detail),
        }
    }
}

/// How a detector run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorStatus {
    /// Ran to completion (possibly with zero findings)
    Completed,
    /// Its data source was absent, so it did not run
    Skipped,
    /// Returned an error or panicked
    Failed,
}

/// Result from running a single detector
#[derive(Debug, Clone)]
pub struct DetectorResult {
    /// Name of the detector that produced these results
    pub detector_name: String,
    pub status: DetectorStatus,
    /// Findings produced by the detector
    pub findings: Vec<Finding>,
    pub detail: Option<AnalysisDetail>,
    /// Execution time in milliseconds
    pub duration_ms: u64,
    /// Error message if the detector failed
    pub error: Option<String>,
}

impl DetectorResult {
    /// Create a successful result
    pub fn success(detector_name: String, output: DetectorOutput, duration_ms: u64) -> Self {
        Self {
            detector_name,
            status: DetectorStatus::Completed,
            findings: output.findings,
            detail: output.detail,
            duration_ms,
            error: None,
        }
    }

    /// Create a result for a detector whose input was missing
    pub fn skipped(detector_name: String) -> Self {
        Self {
            detector_name,
            status: DetectorStatus::Skipped,
            findings: Vec::new(),
            detail: None,
            duration_ms: 0,
            error: None,
        }
    }

    /// Create a failed result
    pub fn failure(detector_name: String, error: String, duration_ms: u64) -> Self {
        Self {
            detector_name,
            status: DetectorStatus::Failed,
            findings: Vec::new(),
            detail: None,
            duration_ms,
            error: Some(error),
        }
    }

    pub fn completed(&self) -> bool {
        self.status == DetectorStatus::Completed
    }
}

/// Trait for all snapshot analyzers
///
/// Detectors only read the normalized snapshot and return fresh output, so
/// any number of them can run concurrently without locking.
///
/// # Example Implementation
///
/// ```ignore
/// pub struct MyDetector;
///
/// impl Detector for MyDetector {
///     fn name(&self) -> &'static str {
///         "my_detector"
///     }
///
///     fn description(&self) -> &'static str {
///         "Detects something worth knowing"
///     }
///
///     fn category(&self) -> Category {
///         Category::Entities
///     }
///
///     fn detect(&self, snapshot: &Snapshot) -> Result<DetectorOutput> {
///         Ok(DetectorOutput::default())
///     }
/// }
/// ```
pub trait Detector: Send + Sync {
    /// Unique identifier, reported in `diagnostics_performed`
    fn name(&self) -> &'static str;

    /// Human-readable description of what this detector finds
    fn description(&self) -> &'static str;

    /// Category of every finding this detector emits
    fn category(&self) -> Category;

    /// Whether the snapshot carries the data this detector needs.
    ///
    /// A detector that cannot run is skipped and left out of
    /// `diagnostics_performed`; one that runs and finds nothing is not.
    fn can_run(&self, _snapshot: &Snapshot) -> bool {
        true
    }

    /// Run detection and return findings
    fn detect(&self, snapshot: &Snapshot) -> Result<DetectorOutput>;
}

/// Summary statistics from running all detectors
#[derive(Debug, Clone, Default)]
pub struct DetectionSummary {
    /// Total number of detectors considered
    pub detectors_run: usize,
    pub detectors_succeeded: usize,
    pub detectors_skipped: usize,
    pub detectors_failed: usize,
    /// Total findings across all detectors
    pub total_findings: usize,
    /// Findings by severity
    pub by_severity: HashMap<Severity, usize>,
    /// Total execution time in milliseconds
    pub total_duration_ms: u64,
}

impl DetectionSummary {
    /// Update summary with a detector result
    pub fn add_result(&mut self, result: &DetectorResult) {
        self.detectors_run += 1;
        self.total_duration_ms += result.duration_ms;

        match result.status {
            DetectorStatus::Completed => {
                self.detectors_succeeded += 1;
                self.total_findings += result.findings.len();
                for finding in &result.findings {
                    *self.by_severity.entry(finding.severity()).or_insert(0) += 1;
                }
            }
            DetectorStatus::Skipped => self.detectors_skipped += 1,
            DetectorStatus::Failed => self.detectors_failed += 1,
        }
    }
}
