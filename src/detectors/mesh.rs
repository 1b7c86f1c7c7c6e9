//! Zigbee mesh topology analyzer
//!
//! Builds an undirected petgraph over mesh devices from the reported
//! neighbor tables and computes link-quality statistics.
//!
//! # Algorithm
//!
//! 1. Add a node for every device with a mesh role and every link endpoint
//! 2. Merge links reported from both ends into one edge per unordered pair
//! 3. Walk edges for averages, weak links and the LQI histogram
//! 4. Nodes with degree zero (other than the coordinator) are orphans

use crate::config::MeshConfig;
use crate::detectors::base::{AnalysisDetail, Detector, DetectorOutput};
use crate::models::{Category, Finding, Severity};
use crate::scoring::{round_one_decimal, score_findings};
use crate::telemetry::{DeviceRole, NeighborLink, Snapshot};
use anyhow::Result;
use petgraph::algo::connected_components;
use petgraph::graph::{NodeIndex, UnGraph};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

const DETECTOR_NAME: &str = "mesh_topology";

/// LQI histogram over five fixed bands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LqiHistogram {
    /// < 80
    pub critical: usize,
    /// 80-119
    pub poor: usize,
    /// 120-149
    pub fair: usize,
    /// 150-199
    pub good: usize,
    /// 200-255
    pub excellent: usize,
}

impl LqiHistogram {
    fn record(&mut self, lqi: f64) {
        match lqi {
            l if l < 80.0 => self.critical += 1,
            l if l < 120.0 => self.poor += 1,
            l if l < 150.0 => self.fair += 1,
            l if l < 200.0 => self.good += 1,
            _ => self.excellent += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.critical + self.poor + self.fair + self.good + self.excellent
    }
}

/// Mesh statistics attached to a run's details
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeshStats {
    pub device_count: usize,
    /// Distinct undirected links after merging both-end reports
    pub link_count: usize,
    pub average_lqi: Option<f64>,
    /// Over links that report RSSI
    pub average_rssi: Option<f64>,
    pub weak_links: usize,
    pub lqi_histogram: LqiHistogram,
    pub orphan_devices: Vec<String>,
    pub router_count: usize,
    pub end_device_count: usize,
    pub has_coordinator: bool,
    /// Connected components, isolated devices included
    pub partitions: usize,
    /// 100 minus the severity weights of mesh findings
    pub mesh_score: f64,
}

/// One merged undirected edge
#[derive(Debug, Clone)]
struct MergedLink {
    lqi: f64,
    rssi: Option<f64>,
}

/// Analyzes Zigbee neighbor tables
pub struct MeshTopologyDetector {
    config: MeshConfig,
}

impl MeshTopologyDetector {
    pub fn new(config: MeshConfig) -> Self {
        Self { config }
    }

    /// Merge duplicate reports of the same pair by averaging LQI and RSSI.
    ///
    /// Returns edges keyed by sorted endpoint pair so iteration order is
    /// deterministic.
    fn merge_links(links: &[NeighborLink]) -> BTreeMap<(String, String), MergedLink> {
        let mut grouped: BTreeMap<(String, String), (Vec<f64>, Vec<f64>)> = BTreeMap::new();
        for link in links {
            if link.source == link.target {
                continue;
            }
            let (a, b) = link.pair_key();
            let entry = grouped.entry((a.to_string(), b.to_string())).or_default();
            entry.0.push(f64::from(link.lqi));
            if let Some(rssi) = link.rssi {
                entry.1.push(f64::from(rssi));
            }
        }

        grouped
            .into_iter()
            .map(|(pair, (lqis, rssis))| {
                let merged = MergedLink {
                    lqi: mean(&lqis).unwrap_or(0.0),
                    rssi: mean(&rssis),
                };
                (pair, merged)
            })
            .collect()
    }

    /// Node roles: device registry first, link reports fill the gaps
    fn resolve_roles(snapshot: &Snapshot, links: &[NeighborLink]) -> BTreeMap<String, Option<DeviceRole>> {
        let mut roles: BTreeMap<String, Option<DeviceRole>> = BTreeMap::new();
        for device in &snapshot.devices {
            if let Some(role) = device.mesh_role {
                roles.insert(device.id.clone(), Some(role));
            }
        }
        for link in links {
            for (id, role) in [(&link.source, link.source_role), (&link.target, link.target_role)] {
                let slot = roles.entry(id.clone()).or_insert(None);
                if slot.is_none() {
                    *slot = role;
                }
            }
        }
        roles
    }

    fn device_label(snapshot: &Snapshot, id: &str) -> String {
        snapshot
            .devices
            .iter()
            .find(|d| d.id == id)
            .map(|d| d.display_name().to_string())
            .unwrap_or_else(|| id.to_string())
    }

    fn analyze(&self, snapshot: &Snapshot, links: &[NeighborLink]) -> (MeshStats, Vec<Finding>) {
        let roles = Self::resolve_roles(snapshot, links);
        let merged = Self::merge_links(links);

        let mut graph: UnGraph<&str, MergedLink> = UnGraph::new_undirected();
        let mut node_of: HashMap<&str, NodeIndex> = HashMap::new();
        for id in roles.keys() {
            node_of.insert(id.as_str(), graph.add_node(id.as_str()));
        }
        for ((a, b), link) in &merged {
            if let (Some(&na), Some(&nb)) = (node_of.get(a.as_str()), node_of.get(b.as_str())) {
                graph.add_edge(na, nb, link.clone());
            }
        }

        let mut histogram = LqiHistogram::default();
        let mut weak_links = 0;
        let mut lqis = Vec::with_capacity(graph.edge_count());
        let mut rssis = Vec::new();
        for edge in graph.edge_weights() {
            histogram.record(edge.lqi);
            if edge.lqi < f64::from(self.config.weak_lqi_threshold) {
                weak_links += 1;
            }
            lqis.push(edge.lqi);
            rssis.extend(edge.rssi);
        }

        let orphan_devices: Vec<String> = graph
            .node_indices()
            .filter(|n| graph.neighbors(*n).next().is_none())
            .map(|n| graph[n])
            .filter(|id| roles.get(*id).copied().flatten() != Some(DeviceRole::Coordinator))
            .map(str::to_string)
            .collect();

        let count_role = |role: DeviceRole| roles.values().filter(|r| **r == Some(role)).count();

        let mut findings = Vec::new();
        for id in &orphan_devices {
            findings.push(Finding::new(
                DETECTOR_NAME,
                Category::Mesh,
                Severity::High,
                format!(
                    "Zigbee device '{}' has no mesh links and cannot route through the network",
                    Self::device_label(snapshot, id)
                ),
                vec![id.clone()],
            ));
        }

        let link_count = graph.edge_count();
        if link_count > 0 {
            let weak_fraction = weak_links as f64 / link_count as f64;
            if weak_fraction > self.config.weak_link_fraction {
                findings.push(Finding::new(
                    DETECTOR_NAME,
                    Category::Mesh,
                    Severity::Medium,
                    format!(
                        "{} of {} Zigbee links ({:.0}%) have LQI below {}",
                        weak_links,
                        link_count,
                        weak_fraction * 100.0,
                        self.config.weak_lqi_threshold
                    ),
                    vec![],
                ));
            }
        }

        let stats = MeshStats {
            device_count: graph.node_count(),
            link_count,
            average_lqi: mean(&lqis).map(round_one_decimal),
            average_rssi: mean(&rssis).map(round_one_decimal),
            weak_links,
            lqi_histogram: histogram,
            orphan_devices,
            router_count: count_role(DeviceRole::Router),
            end_device_count: count_role(DeviceRole::EndDevice),
            has_coordinator: count_role(DeviceRole::Coordinator) > 0,
            partitions: connected_components(&graph),
            mesh_score: score_findings(&findings),
        };

        (stats, findings)
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

impl Default for MeshTopologyDetector {
    fn default() -> Self {
        Self::new(MeshConfig::default())
    }
}

impl Detector for MeshTopologyDetector {
    fn name(&self) -> &'static str {
        DETECTOR_NAME
    }

    fn description(&self) -> &'static str {
        "Audits Zigbee link quality, routing roles and unreachable devices"
    }

    fn category(&self) -> Category {
        Category::Mesh
    }

    fn can_run(&self, snapshot: &Snapshot) -> bool {
        snapshot.neighbor_links.is_some()
    }

    fn detect(&self, snapshot: &Snapshot) -> Result<DetectorOutput> {
        let links = snapshot.neighbor_links.as_deref().unwrap_or_default();
        let (stats, findings) = self.analyze(snapshot, links);
        debug!(
            "Mesh: {} devices, {} links, {} weak, {} orphans",
            stats.device_count,
            stats.link_count,
            stats.weak_links,
            stats.orphan_devices.len()
        );
        Ok(DetectorOutput::with_detail(findings, AnalysisDetail::Mesh(stats)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::{DeviceRecord, PowerSource};
    use chrono::Utc;

    fn link(a: &str, b: &str, lqi: u8, rssi: Option<i16>) -> NeighborLink {
        NeighborLink {
            source: a.to_string(),
            target: b.to_string(),
            lqi,
            rssi,
            source_role: None,
            target_role: None,
        }
    }

    fn device(id: &str, role: DeviceRole) -> DeviceRecord {
        DeviceRecord {
            id: id.to_string(),
            name: None,
            manufacturer: None,
            model: None,
            power_source: PowerSource::Mains,
            mesh_role: Some(role),
            entity_ids: vec![],
        }
    }

    fn snapshot(devices: Vec<DeviceRecord>, links: Option<Vec<NeighborLink>>) -> Snapshot {
        let mut s = Snapshot::empty(Utc::now());
        s.devices = devices;
        s.neighbor_links = links;
        s
    }

    fn stats_of(output: &DetectorOutput) -> &MeshStats {
        match &output.detail {
            Some(AnalysisDetail::Mesh(stats)) => stats,
            other => panic!("expected mesh stats, got {:?}", other),
        }
    }

    #[test]
    fn test_no_neighbor_table_cannot_run() {
        let detector = MeshTopologyDetector::default();
        assert!(!detector.can_run(&snapshot(vec![], None)));
        assert!(detector.can_run(&snapshot(vec![], Some(vec![]))));
    }

    #[test]
    fn test_fully_connected_excellent_mesh() {
        let ids = ["c", "r1", "r2", "r3"];
        let mut links = Vec::new();
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                links.push(link(a, b, 230, Some(-30)));
            }
        }
        let s = snapshot(
            vec![
                device("c", DeviceRole::Coordinator),
                device("r1", DeviceRole::Router),
                device("r2", DeviceRole::Router),
                device("r3", DeviceRole::Router),
            ],
            Some(links),
        );
        let output = MeshTopologyDetector::default().detect(&s).unwrap();
        let stats = stats_of(&output);
        assert!(output.findings.is_empty());
        assert_eq!(stats.weak_links, 0);
        assert_eq!(stats.link_count, 6);
        assert_eq!(stats.lqi_histogram.excellent, stats.link_count);
        assert_eq!(stats.router_count, 3);
        assert_eq!(stats.partitions, 1);
        assert_eq!(stats.mesh_score, 100.0);
    }

    #[test]
    fn test_duplicate_reports_are_merged() {
        let s = snapshot(
            vec![],
            Some(vec![link("a", "b", 100, Some(-60)), link("b", "a", 140, None)]),
        );
        let output = MeshTopologyDetector::default().detect(&s).unwrap();
        let stats = stats_of(&output);
        assert_eq!(stats.link_count, 1);
        assert_eq!(stats.average_lqi, Some(120.0));
        assert_eq!(stats.average_rssi, Some(-60.0));
        assert_eq!(stats.weak_links, 0);
    }

    #[test]
    fn test_orphan_device_is_high_finding() {
        let s = snapshot(
            vec![
                device("coord", DeviceRole::Coordinator),
                device("plug", DeviceRole::Router),
                device("lonely", DeviceRole::EndDevice),
            ],
            Some(vec![link("coord", "plug", 210, Some(-40))]),
        );
        let output = MeshTopologyDetector::default().detect(&s).unwrap();
        assert_eq!(output.findings.len(), 1);
        assert_eq!(output.findings[0].severity(), Severity::High);
        assert_eq!(output.findings[0].affected_entities(), ["lonely".to_string()]);
        let stats = stats_of(&output);
        assert_eq!(stats.orphan_devices, vec!["lonely"]);
        assert_eq!(stats.partitions, 2);
        assert_eq!(stats.mesh_score, 90.0);
    }

    #[test]
    fn test_isolated_coordinator_is_not_an_orphan() {
        let s = snapshot(vec![device("coord", DeviceRole::Coordinator)], Some(vec![]));
        let output = MeshTopologyDetector::default().detect(&s).unwrap();
        assert!(output.findings.is_empty());
        assert_eq!(stats_of(&output).average_lqi, None);
    }

    #[test]
    fn test_weak_link_fraction() {
        let links = vec![
            link("a", "b", 60, None),
            link("b", "c", 90, None),
            link("c", "d", 210, None),
            link("d", "e", 160, None),
        ];
        let output = MeshTopologyDetector::default()
            .detect(&snapshot(vec![], Some(links)))
            .unwrap();
        let stats = stats_of(&output);
        assert_eq!(stats.weak_links, 2);
        assert_eq!(
            stats.lqi_histogram,
            LqiHistogram {
                critical: 1,
                poor: 1,
                fair: 0,
                good: 1,
                excellent: 1
            }
        );
        assert_eq!(output.findings.len(), 1);
        assert_eq!(output.findings[0].severity(), Severity::Medium);
    }

    #[test]
    fn test_weak_fraction_at_threshold_is_not_flagged() {
        let mut links: Vec<_> = (0..4).map(|i| link("hub", &format!("n{}", i), 220, None)).collect();
        links.push(link("hub", "n9", 50, None));
        let output = MeshTopologyDetector::default()
            .detect(&snapshot(vec![], Some(links)))
            .unwrap();
        assert_eq!(stats_of(&output).weak_links, 1);
        assert!(output.findings.is_empty());
    }
}
