//! Entity availability and freshness

use crate::config::EntityConfig;
use crate::detectors::base::{Detector, DetectorOutput};
use crate::models::{Category, Finding, Severity};
use crate::telemetry::Snapshot;
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};

const DETECTOR_NAME: &str = "entity_availability";

const UNAVAILABLE_STATES: [&str; 2] = ["unavailable", "unknown"];

/// Reports unavailable entities and sensors that stopped updating
pub struct EntityAvailabilityDetector {
    config: EntityConfig,
}

impl EntityAvailabilityDetector {
    pub fn new(config: EntityConfig) -> Self {
        Self { config }
    }

    fn unavailable_finding(&self, snapshot: &Snapshot) -> Option<Finding> {
        let unavailable: Vec<String> = snapshot
            .entities
            .iter()
            .filter(|e| UNAVAILABLE_STATES.contains(&e.state.to_lowercase().as_str()))
            .map(|e| e.entity_id.clone())
            .collect();
        if unavailable.is_empty() {
            return None;
        }

        let severity = if unavailable.len() >= self.config.unavailable_high_count {
            Severity::High
        } else {
            Severity::Medium
        };
        Some(Finding::new(
            DETECTOR_NAME,
            Category::Entities,
            severity,
            format!("{} entities are unavailable or in an unknown state", unavailable.len()),
            unavailable,
        ))
    }

    fn stale_finding(&self, snapshot: &Snapshot) -> Option<Finding> {
        let cutoff = snapshot
            .captured_at
            .checked_sub_signed(Duration::hours(i64::from(self.config.stale_hours)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let stale: Vec<String> = snapshot
            .entities
            .iter()
            .filter(|e| self.config.stale_domains.iter().any(|d| d == e.domain()))
            .filter(|e| !UNAVAILABLE_STATES.contains(&e.state.to_lowercase().as_str()))
            .filter(|e| e.last_updated.is_some_and(|t| t < cutoff))
            .map(|e| e.entity_id.clone())
            .collect();
        if stale.is_empty() {
            return None;
        }

        Some(Finding::new(
            DETECTOR_NAME,
            Category::Entities,
            Severity::Low,
            format!(
                "{} entities have not updated in over {} hours",
                stale.len(),
                self.config.stale_hours
            ),
            stale,
        ))
    }
}

impl Default for EntityAvailabilityDetector {
    fn default() -> Self {
        Self::new(EntityConfig::default())
    }
}

impl Detector for EntityAvailabilityDetector {
    fn name(&self) -> &'static str {
        DETECTOR_NAME
    }

    fn description(&self) -> &'static str {
        "Finds unavailable entities and sensors that stopped reporting"
    }

    fn category(&self) -> Category {
        Category::Entities
    }

    fn detect(&self, snapshot: &Snapshot) -> Result<DetectorOutput> {
        let findings = self
            .unavailable_finding(snapshot)
            .into_iter()
            .chain(self.stale_finding(snapshot))
            .collect();
        Ok(DetectorOutput::findings(findings))
    }
}
