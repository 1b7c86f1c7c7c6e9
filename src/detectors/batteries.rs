//! Battery level checks

use crate::config::BatteryConfig;
use crate::detectors::base::{Detector, DetectorOutput};
use crate::models::{Category, Finding, Severity};
use crate::telemetry::{EntityRecord, Snapshot};
use anyhow::Result;

const DETECTOR_NAME: &str = "battery_health";

/// Reports battery entities below the low and critical levels
pub struct BatteryHealthDetector {
    config: BatteryConfig,
}

impl BatteryHealthDetector {
    pub fn new(config: BatteryConfig) -> Self {
        Self { config }
    }

    fn is_battery(entity: &EntityRecord) -> bool {
        if entity.attribute_str("device_class") == Some("battery") {
            return true;
        }
        entity.attribute_str("unit_of_measurement") == Some("%") && entity.entity_id.ends_with("_battery")
    }

    /// Battery entities with a numeric level, sorted by level then id
    fn battery_levels(snapshot: &Snapshot) -> Vec<(&str, f64)> {
        let mut levels: Vec<(&str, f64)> = snapshot
            .entities
            .iter()
            .filter(|e| Self::is_battery(e))
            .filter_map(|e| e.numeric_state().map(|level| (e.entity_id.as_str(), level)))
            .collect();
        levels.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(b.0)));
        levels
    }
}

impl Default for BatteryHealthDetector {
    fn default() -> Self {
        Self::new(BatteryConfig::default())
    }
}

impl Detector for BatteryHealthDetector {
    fn name(&self) -> &'static str {
        DETECTOR_NAME
    }

    fn description(&self) -> &'static str {
        "Flags battery-powered devices running low"
    }

    fn category(&self) -> Category {
        Category::Batteries
    }

    fn detect(&self, snapshot: &Snapshot) -> Result<DetectorOutput> {
        let levels = Self::battery_levels(snapshot);
        let (critical, low): (Vec<_>, Vec<_>) = levels
            .into_iter()
            .filter(|(_, level)| *level < self.config.low_percent)
            .partition(|(_, level)| *level < self.config.critical_percent);

        let mut findings = Vec::new();
        if !critical.is_empty() {
            findings.push(Finding::new(
                DETECTOR_NAME,
                Category::Batteries,
                Severity::High,
                format!(
                    "{} batteries are below {}%: {}",
                    critical.len(),
                    self.config.critical_percent,
                    describe(&critical)
                ),
                critical.iter().map(|(id, _)| id.to_string()).collect(),
            ));
        }
        if !low.is_empty() {
            findings.push(Finding::new(
                DETECTOR_NAME,
                Category::Batteries,
                Severity::Medium,
                format!(
                    "{} batteries are below {}%: {}",
                    low.len(),
                    self.config.low_percent,
                    describe(&low)
                ),
                low.iter().map(|(id, _)| id.to_string()).collect(),
            ));
        }
        Ok(DetectorOutput::findings(findings))
    }
}

fn describe(levels: &[(&str, f64)]) -> String {
    levels
        .iter()
        .map(|(id, level)| format!("{} ({:.0}%)", id, level))
        .collect::<Vec<_>>()
        .join(", ")
}
