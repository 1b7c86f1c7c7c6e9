//! Energy consumption aggregator
//!
//! Sums samples per device over a trailing window ending at the snapshot's
//! capture time and prices the total at a flat tariff.

use crate::config::EnergyConfig;
use crate::detectors::base::{AnalysisDetail, Detector, DetectorOutput};
use crate::models::{Category, Finding, Severity};
use crate::telemetry::{EnergySample, Snapshot};
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

const DETECTOR_NAME: &str = "energy_consumption";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Consumer {
    pub entity_id: String,
    pub kwh: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnergyReport {
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    /// Devices with at least one sample in the window
    pub per_device: BTreeMap<String, f64>,
    pub total_kwh: f64,
    pub cost_per_kwh: f64,
    pub estimated_cost: f64,
    /// Largest consumers first
    pub top_consumers: Vec<Consumer>,
}

/// Aggregates energy samples per device
pub struct EnergyDetector {
    config: EnergyConfig,
}

impl EnergyDetector {
    pub fn new(config: EnergyConfig) -> Self {
        Self { config }
    }

    /// Totals over `(end - window_hours, end]`. A window reaching past the
    /// earliest representable instant starts there.
    pub fn aggregate(&self, samples: &[EnergySample], end: DateTime<Utc>) -> EnergyReport {
        let start = end
            .checked_sub_signed(Duration::hours(i64::from(self.config.window_hours)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let mut per_device: BTreeMap<String, f64> = BTreeMap::new();
        for sample in samples {
            if sample.timestamp <= start || sample.timestamp > end {
                continue;
            }
            *per_device.entry(sample.entity_id.clone()).or_insert(0.0) += sample.kwh;
        }

        let total_kwh: f64 = per_device.values().sum();

        let mut ranked: Vec<Consumer> = per_device
            .iter()
            .map(|(id, kwh)| Consumer {
                entity_id: id.clone(),
                kwh: *kwh,
            })
            .collect();
        ranked.sort_by(|a, b| b.kwh.total_cmp(&a.kwh).then_with(|| a.entity_id.cmp(&b.entity_id)));
        ranked.truncate(self.config.top_consumers);

        EnergyReport {
            window_start: start,
            window_end: end,
            per_device,
            total_kwh,
            cost_per_kwh: self.config.cost_per_kwh,
            estimated_cost: total_kwh * self.config.cost_per_kwh,
            top_consumers: ranked,
        }
    }

    fn findings(&self, report: &EnergyReport) -> Vec<Finding> {
        if report.total_kwh <= self.config.report_threshold_kwh || report.top_consumers.is_empty() {
            return Vec::new();
        }

        let listed: Vec<String> = report
            .top_consumers
            .iter()
            .map(|c| format!("{} ({:.2} kWh)", c.entity_id, c.kwh))
            .collect();
        vec![Finding::new(
            DETECTOR_NAME,
            Category::Energy,
            Severity::Low,
            format!(
                "{:.2} kWh used in the last {}h (est. cost {:.2}); top consumers: {}",
                report.total_kwh,
                self.config.window_hours,
                report.estimated_cost,
                listed.join(", ")
            ),
            report.top_consumers.iter().map(|c| c.entity_id.clone()).collect(),
        )]
    }
}

impl Default for EnergyDetector {
    fn default() -> Self {
        Self::new(EnergyConfig::default())
    }
}

impl Detector for EnergyDetector {
    fn name(&self) -> &'static str {
        DETECTOR_NAME
    }

    fn description(&self) -> &'static str {
        "Aggregates per-device energy use and estimated cost"
    }

    fn category(&self) -> Category {
        Category::Energy
    }

    fn can_run(&self, snapshot: &Snapshot) -> bool {
        snapshot.energy_samples.is_some()
    }

    fn detect(&self, snapshot: &Snapshot) -> Result<DetectorOutput> {
        let samples = snapshot.energy_samples.as_deref().unwrap_or_default();
        let report = self.aggregate(samples, snapshot.captured_at);
        debug!(
            "Energy: {:.3} kWh over {} devices",
            report.total_kwh,
            report.per_device.len()
        );
        let findings = self.findings(&report);
        Ok(DetectorOutput::with_detail(findings, AnalysisDetail::Energy(report)))
    }
}
