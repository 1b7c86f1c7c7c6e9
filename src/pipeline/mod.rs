//! Diagnostic pipeline
//!
//! Orchestrates one diagnostic invocation:
//! 1. Register the detectors enabled by the capability set
//! 2. Run them in parallel over the normalized snapshot
//! 3. Fold their findings into a `HealthReport`
//! 4. Collect analyzer detail payloads next to the report

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::DiagnosticsConfig;
use crate::detectors::{
    default_detectors, AnalysisDetail, ConflictReport, DetectorEngine, EnergyReport, MeshStats,
    OrphanReport,
};
use crate::history::{HistoryEntry, SnapshotHistory};
use crate::models::HealthReport;
use crate::scoring::HealthScorer;
use crate::telemetry::Snapshot;

/// Analyzer payloads from one run; absent when the analyzer did not run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunDetails {
    pub mesh: Option<MeshStats>,
    pub orphans: Option<OrphanReport>,
    pub conflicts: Option<ConflictReport>,
    pub energy: Option<EnergyReport>,
}

impl RunDetails {
    fn absorb(&mut self, detail: AnalysisDetail) {
        match detail {
            AnalysisDetail::Mesh(stats) => self.mesh = Some(stats),
            AnalysisDetail::Orphans(report) => self.orphans = Some(report),
            AnalysisDetail::Conflicts(report) => self.conflicts = Some(report),
            AnalysisDetail::Energy(report) => self.energy = Some(report),
        }
    }
}

/// Output of one diagnostic invocation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticRun {
    #[serde(flatten)]
    pub report: HealthReport,
    pub details: RunDetails,
}

/// Run every enabled analyzer over one snapshot and score the result.
///
/// `workers` sizes the thread pool (0 = auto). Only pool construction can
/// fail; analyzer failures leave the analyzer out of
/// `diagnostics_performed`.
pub fn run_diagnostics(snapshot: &Snapshot, config: &DiagnosticsConfig, workers: usize) -> Result<DiagnosticRun> {
    let mut engine = DetectorEngine::new(workers);
    engine.register_all(default_detectors(config));

    let results = engine.run(snapshot)?;

    let mut findings = Vec::new();
    let mut performed = Vec::new();
    let mut details = RunDetails::default();
    for result in results {
        if !result.completed() {
            debug!("{} not included in report ({:?})", result.detector_name, result.status);
            continue;
        }
        performed.push(result.detector_name);
        findings.extend(result.findings);
        if let Some(detail) = result.detail {
            details.absorb(detail);
        }
    }

    let report = HealthScorer::new().score(findings, performed);
    info!(
        "Health score {:.1} ({}) with {} issues",
        report.overall_score, report.overall_label, report.total_issues
    );

    Ok(DiagnosticRun { report, details })
}

/// Holds the resolved configuration and an injected run history
pub struct DiagnosticsService {
    config: DiagnosticsConfig,
    history: SnapshotHistory,
    workers: usize,
}

impl DiagnosticsService {
    pub fn new(config: DiagnosticsConfig, history: SnapshotHistory) -> Self {
        Self {
            config,
            history,
            workers: 0,
        }
    }

    /// Service with a history sized from the config
    pub fn from_config(config: DiagnosticsConfig) -> Self {
        let history = SnapshotHistory::new(config.history.capacity);
        Self::new(config, history)
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Analyze a snapshot and record it in the history
    pub fn diagnose(&mut self, snapshot: &Snapshot) -> Result<DiagnosticRun> {
        let run = run_diagnostics(snapshot, &self.config, self.workers)?;
        self.history
            .record(HistoryEntry::from_report(snapshot.captured_at, &run.report));
        Ok(run)
    }

    pub fn config(&self) -> &DiagnosticsConfig {
        &self.config
    }

    pub fn history(&self) -> &SnapshotHistory {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HealthLabel;
    use crate::telemetry::NeighborLink;
    use chrono::Utc;

    #[test]
    fn test_empty_snapshot_skips_optional_sources() {
        let run = run_diagnostics(&Snapshot::empty(Utc::now()), &DiagnosticsConfig::default(), 2).unwrap();
        assert_eq!(run.report.overall_score, 100.0);
        assert_eq!(run.report.overall_label, HealthLabel::Excellent);
        assert_eq!(
            run.report.diagnostics_performed,
            vec!["entity_availability", "orphan_entities", "battery_health", "automation_conflicts"]
        );
        assert!(run.details.mesh.is_none());
        assert!(run.details.orphans.is_some());
    }

    #[test]
    fn test_disabled_capability_is_not_performed() {
        let mut config = DiagnosticsConfig::default();
        config.capabilities.conflicts = false;
        let run = run_diagnostics(&Snapshot::empty(Utc::now()), &config, 1).unwrap();
        assert!(!run
            .report
            .diagnostics_performed
            .contains(&"automation_conflicts".to_string()));
        assert!(run.details.conflicts.is_none());
    }

    #[test]
    fn test_service_records_history() {
        let mut service = DiagnosticsService::from_config(DiagnosticsConfig::default()).with_workers(1);
        let mut snapshot = Snapshot::empty(Utc::now());
        service.diagnose(&snapshot).unwrap();

        snapshot.neighbor_links = Some(vec![NeighborLink {
            source: "a".into(),
            target: "b".into(),
            lqi: 40,
            rssi: None,
            source_role: None,
            target_role: None,
        }]);
        service.diagnose(&snapshot).unwrap();

        assert_eq!(service.history().len(), 2);
        assert_eq!(service.history().score_delta(), Some(-4.0));
    }
}
