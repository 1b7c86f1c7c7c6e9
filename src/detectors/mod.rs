//! Snapshot analyzers
//!
//! This module provides the detector framework and one detector per
//! diagnostic concern.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     DetectorEngine                          │
//! │  - Registers detectors                                      │
//! │  - Runs them in parallel (rayon), panic-isolated            │
//! │  - Returns results in registration order                    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Detector Trait                         │
//! │  - name(): Unique identifier                                │
//! │  - category(): Finding category                             │
//! │  - can_run(snapshot): Is the data source present?           │
//! │  - detect(snapshot): Findings plus optional detail          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Detectors
//!
//! - `EntityAvailabilityDetector` - Unavailable and stale entities
//! - `OrphanEntityDetector` - Entities nothing references
//! - `BatteryHealthDetector` - Low and critical batteries
//! - `ErrorLogDetector` - Error and warning counts from the system log
//! - `RepairItemsDetector` - Open repair issues
//! - `UpdateStatusDetector` - Pending updates
//! - `MeshTopologyDetector` - Zigbee link quality and orphan devices
//! - `AutomationConflictDetector` - Contradictory automations and loops
//! - `EnergyDetector` - Per-device consumption and cost
//!
//! # Usage
//!
//! ```ignore
//! use homediag::detectors::{default_detectors, DetectorEngine};
//!
//! let mut engine = DetectorEngine::new(0);
//! engine.register_all(default_detectors(&config));
//! let results = engine.run(&snapshot)?;
//! ```

mod automation_conflicts;
mod base;
mod batteries;
mod energy;
mod engine;
mod entity_health;
mod error_log;
mod mesh;
mod orphan_entities;
mod repairs;
mod updates;

pub use automation_conflicts::{AutomationConflictDetector, ConflictReport, ContradictoryPair};
pub use base::{AnalysisDetail, DetectionSummary, Detector, DetectorOutput, DetectorResult, DetectorStatus};
pub use batteries::BatteryHealthDetector;
pub use energy::{Consumer, EnergyDetector, EnergyReport};
pub use engine::DetectorEngine;
pub use entity_health::EntityAvailabilityDetector;
pub use error_log::ErrorLogDetector;
pub use mesh::{LqiHistogram, MeshStats, MeshTopologyDetector};
pub use orphan_entities::{entity_dependencies, EntityDependencies, OrphanEntityDetector, OrphanReport};
pub use repairs::RepairItemsDetector;
pub use updates::UpdateStatusDetector;

use crate::config::DiagnosticsConfig;
use std::sync::Arc;

/// Detectors enabled by the capability set, in canonical category order.
///
/// Disabled capabilities are never registered, so they cannot appear in
/// `diagnostics_performed`.
pub fn default_detectors(config: &DiagnosticsConfig) -> Vec<Arc<dyn Detector>> {
    let caps = &config.capabilities;
    let mut detectors: Vec<Arc<dyn Detector>> = Vec::new();

    // Entities
    if caps.entities {
        detectors.push(Arc::new(EntityAvailabilityDetector::new(config.entities.clone())));
    }
    if caps.orphans {
        detectors.push(Arc::new(OrphanEntityDetector::new(config.orphans.clone())));
    }
    // Batteries, logs, repairs, updates
    if caps.batteries {
        detectors.push(Arc::new(BatteryHealthDetector::new(config.batteries.clone())));
    }
    if caps.logs {
        detectors.push(Arc::new(ErrorLogDetector::new(config.logs.clone())));
    }
    if caps.repairs {
        detectors.push(Arc::new(RepairItemsDetector::new()));
    }
    if caps.updates {
        detectors.push(Arc::new(UpdateStatusDetector::new()));
    }
    // Mesh, automations, energy
    if caps.mesh {
        detectors.push(Arc::new(MeshTopologyDetector::new(config.mesh.clone())));
    }
    if caps.conflicts {
        detectors.push(Arc::new(AutomationConflictDetector::new(config.conflicts.clone())));
    }
    if caps.energy {
        detectors.push(Arc::new(EnergyDetector::new(config.energy.clone())));
    }

    detectors
}
