//! Open repair issues
//!
//! Integrations raise repair issues for broken configuration, deprecated
//! YAML and similar problems that need a human. Dismissed issues are left
//! out; the rest are grouped by severity into one finding per tier.

use crate::detectors::base::{Detector, DetectorOutput};
use crate::models::{Category, Finding, Severity};
use crate::telemetry::{RepairRecord, Snapshot};
use anyhow::Result;

const DETECTOR_NAME: &str = "repair_items";

/// Reports open items from the repairs panel
#[derive(Default)]
pub struct RepairItemsDetector;

impl RepairItemsDetector {
    pub fn new() -> Self {
        Self
    }

    fn severity_of(repair: &RepairRecord) -> Severity {
        match repair.severity.as_str() {
            "critical" => Severity::High,
            "error" => Severity::Medium,
            _ if repair.breaks_in_version.is_some() => Severity::Medium,
            _ => Severity::Low,
        }
    }
}

fn describe(repair: &RepairRecord) -> String {
    match &repair.breaks_in_version {
        Some(version) => format!("{} (breaks in {})", repair.display_name(), version),
        None => repair.display_name(),
    }
}

impl Detector for RepairItemsDetector {
    fn name(&self) -> &'static str {
        DETECTOR_NAME
    }

    fn description(&self) -> &'static str {
        "Lists open repair issues raised by integrations"
    }

    fn category(&self) -> Category {
        Category::LogsErrors
    }

    fn can_run(&self, snapshot: &Snapshot) -> bool {
        snapshot.repairs.is_some()
    }

    fn detect(&self, snapshot: &Snapshot) -> Result<DetectorOutput> {
        let repairs = snapshot.repairs.as_deref().unwrap_or_default();
        let open: Vec<&RepairRecord> = repairs.iter().filter(|r| !r.ignored).collect();

        let mut findings = Vec::new();
        for severity in [Severity::High, Severity::Medium, Severity::Low] {
            let tier: Vec<&RepairRecord> = open
                .iter()
                .copied()
                .filter(|r| Self::severity_of(r) == severity)
                .collect();
            if tier.is_empty() {
                continue;
            }
            let names: Vec<String> = tier.iter().map(|r| describe(r)).collect();
            findings.push(Finding::new(
                DETECTOR_NAME,
                Category::LogsErrors,
                severity,
                format!("{} open repair issues: {}", tier.len(), names.join(", ")),
                Vec::new(),
            ));
        }
        Ok(DetectorOutput::findings(findings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn repair(id: &str, severity: &str, breaks: Option<&str>, ignored: bool) -> RepairRecord {
        RepairRecord {
            issue_id: id.to_string(),
            domain: Some("mqtt".to_string()),
            severity: severity.to_string(),
            ignored,
            is_fixable: false,
            breaks_in_version: breaks.map(str::to_string),
        }
    }

    #[test]
    fn test_repairs_grouped_by_severity() {
        let mut snapshot = Snapshot::empty(Utc::now());
        snapshot.repairs = Some(vec![
            repair("broker_down", "critical", None, false),
            repair("deprecated_yaml", "warning", Some("2024.8.0"), false),
            repair("old_schema", "error", None, false),
            repair("cosmetic", "warning", None, false),
            repair("dismissed", "critical", None, true),
        ]);
        let output = RepairItemsDetector::new().detect(&snapshot).unwrap();
        let tiers: Vec<_> = output.findings.iter().map(|f| f.severity()).collect();
        assert_eq!(tiers, vec![Severity::High, Severity::Medium, Severity::Low]);

        assert_eq!(output.findings[0].description(), "1 open repair issues: mqtt/broker_down");
        assert!(output.findings[1]
            .description()
            .contains("mqtt/deprecated_yaml (breaks in 2024.8.0)"));
        assert!(output.findings[1].description().starts_with("2 open"));
        assert!(!output.findings.iter().any(|f| f.description().contains("dismissed")));
    }

    #[test]
    fn test_no_open_repairs() {
        let mut snapshot = Snapshot::empty(Utc::now());
        snapshot.repairs = Some(vec![repair("dismissed", "error", None, true)]);
        let detector = RepairItemsDetector::new();
        assert!(detector.can_run(&snapshot));
        assert!(detector.detect(&snapshot).unwrap().findings.is_empty());
        assert!(!detector.can_run(&Snapshot::empty(Utc::now())));
    }
}
