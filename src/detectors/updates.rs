//! Pending update checks

use crate::detectors::base::{Detector, DetectorOutput};
use crate::models::{Category, Finding, Severity};
use crate::telemetry::{Snapshot, UpdateRecord};
use anyhow::Result;

const DETECTOR_NAME: &str = "update_status";

/// Reports pending platform and integration updates
#[derive(Default)]
pub struct UpdateStatusDetector;

impl UpdateStatusDetector {
    pub fn new() -> Self {
        Self
    }
}

fn describe(updates: &[&UpdateRecord]) -> String {
    updates
        .iter()
        .map(|u| match (&u.installed_version, &u.latest_version) {
            (Some(installed), Some(latest)) => format!("{} {} → {}", u.display_name(), installed, latest),
            (_, Some(latest)) => format!("{} → {}", u.display_name(), latest),
            _ => u.display_name().to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

impl Detector for UpdateStatusDetector {
    fn name(&self) -> &'static str {
        DETECTOR_NAME
    }

    fn description(&self) -> &'static str {
        "Lists pending core, supervisor, OS and integration updates"
    }

    fn category(&self) -> Category {
        Category::Updates
    }

    fn can_run(&self, snapshot: &Snapshot) -> bool {
        snapshot.updates.is_some()
    }

    fn detect(&self, snapshot: &Snapshot) -> Result<DetectorOutput> {
        let updates = snapshot.updates.as_deref().unwrap_or_default();
        let (platform, other): (Vec<&UpdateRecord>, Vec<&UpdateRecord>) = updates
            .iter()
            .filter(|u| u.is_pending())
            .partition(|u| u.is_platform());

        let mut findings = Vec::new();
        if !platform.is_empty() {
            findings.push(Finding::new(
                DETECTOR_NAME,
                Category::Updates,
                Severity::Medium,
                format!("Platform updates available: {}", describe(&platform)),
                platform.iter().map(|u| u.entity_id.clone()).collect(),
            ));
        }
        if !other.is_empty() {
            findings.push(Finding::new(
                DETECTOR_NAME,
                Category::Updates,
                Severity::Low,
                format!("{} updates available: {}", other.len(), describe(&other)),
                other.iter().map(|u| u.entity_id.clone()).collect(),
            ));
        }
        Ok(DetectorOutput::findings(findings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn update(id: &str, installed: &str, latest: &str) -> UpdateRecord {
        UpdateRecord {
            entity_id: id.to_string(),
            title: None,
            installed_version: Some(installed.to_string()),
            latest_version: Some(latest.to_string()),
        }
    }

    #[test]
    fn test_platform_and_other_updates() {
        let mut snapshot = Snapshot::empty(Utc::now());
        snapshot.updates = Some(vec![
            update("update.home_assistant_core_update", "2024.4.0", "2024.5.1"),
            update("update.zigbee2mqtt_update", "1.36.0", "1.37.1"),
            update("update.hacs_update", "1.34.0", "1.34.0"),
        ]);
        let output = UpdateStatusDetector::new().detect(&snapshot).unwrap();
        assert_eq!(output.findings.len(), 2);
        assert_eq!(output.findings[0].severity(), Severity::Medium);
        assert!(output.findings[0]
            .description()
            .contains("update.home_assistant_core_update 2024.4.0 → 2024.5.1"));
        assert_eq!(output.findings[1].severity(), Severity::Low);
        assert_eq!(
            output.findings[1].affected_entities(),
            ["update.zigbee2mqtt_update".to_string()]
        );
    }

    #[test]
    fn test_up_to_date() {
        let mut snapshot = Snapshot::empty(Utc::now());
        snapshot.updates = Some(vec![update("update.x", "1", "1")]);
        assert!(UpdateStatusDetector::new().detect(&snapshot).unwrap().findings.is_empty());
        assert!(!UpdateStatusDetector::new().can_run(&Snapshot::empty(Utc::now())));
    }
}
