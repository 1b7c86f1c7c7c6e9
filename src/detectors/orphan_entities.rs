//! Orphan entity detector
//!
//! Builds a directed reference graph from every automation, script and
//! dashboard to the entities it mentions, then reports entities with zero
//! inbound edges. Identifier matching is exact and case-sensitive.
//!
//! The same graph answers the reverse question for a single entity: which
//! automations, scripts and dashboards depend on it (`entity_dependencies`).

use crate::config::OrphanConfig;
use crate::detectors::base::{AnalysisDetail, Detector, DetectorOutput};
use crate::models::{Category, Finding, Severity};
use crate::scoring::round_one_decimal;
use crate::telemetry::{entity_domain, Snapshot};
use anyhow::Result;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

const DETECTOR_NAME: &str = "orphan_entities";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrphanReport {
    /// Sorted orphan identifiers
    pub orphans: Vec<String>,
    pub orphans_by_domain: BTreeMap<String, usize>,
    /// Share of considered entities that are orphans, in percent
    pub orphan_percentage: f64,
    /// Entities eligible for orphan status (excluded domains left out)
    pub considered_entities: usize,
    pub referenced_entities: usize,
}

/// Everything that references one entity, each list sorted
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EntityDependencies {
    pub entity_id: String,
    /// False when the snapshot has no state for the entity
    pub known: bool,
    pub automations: Vec<String>,
    pub scripts: Vec<String>,
    pub dashboards: Vec<String>,
}

impl EntityDependencies {
    pub fn total(&self) -> usize {
        self.automations.len() + self.scripts.len() + self.dashboards.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReferrerKind {
    Automation,
    Script,
    Dashboard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefNode<'a> {
    Referrer(ReferrerKind, &'a str),
    Entity(&'a str),
}

/// Automations, scripts and dashboards that mention `entity_id`
pub fn entity_dependencies(snapshot: &Snapshot, entity_id: &str) -> EntityDependencies {
    let (graph, entity_nodes) = OrphanEntityDetector::build_reference_graph(snapshot);
    let mut deps = EntityDependencies {
        entity_id: entity_id.to_string(),
        known: snapshot.entity(entity_id).is_some(),
        ..Default::default()
    };

    let Some(&node) = entity_nodes.get(entity_id) else {
        return deps;
    };
    for referrer in graph.neighbors_directed(node, Direction::Incoming) {
        if let RefNode::Referrer(kind, id) = graph[referrer] {
            let bucket = match kind {
                ReferrerKind::Automation => &mut deps.automations,
                ReferrerKind::Script => &mut deps.scripts,
                ReferrerKind::Dashboard => &mut deps.dashboards,
            };
            bucket.push(id.to_string());
        }
    }
    for bucket in [&mut deps.automations, &mut deps.scripts, &mut deps.dashboards] {
        bucket.sort();
        bucket.dedup();
    }
    deps
}

/// Finds entities no automation, script or dashboard uses
pub struct OrphanEntityDetector {
    config: OrphanConfig,
}

impl OrphanEntityDetector {
    pub fn new(config: OrphanConfig) -> Self {
        Self { config }
    }

    fn is_excluded(&self, entity_id: &str) -> bool {
        let domain = entity_domain(entity_id);
        self.config.excluded_domains.iter().any(|d| d == domain)
    }

    /// Referrer → entity edges for every mention
    fn build_reference_graph(snapshot: &Snapshot) -> (DiGraph<RefNode<'_>, ()>, HashMap<&str, NodeIndex>) {
        let mut graph = DiGraph::new();
        let mut entity_nodes: HashMap<&str, NodeIndex> = HashMap::new();

        for entity in &snapshot.entities {
            let idx = graph.add_node(RefNode::Entity(entity.entity_id.as_str()));
            entity_nodes.insert(entity.entity_id.as_str(), idx);
        }

        let referrers = snapshot
            .automations
            .iter()
            .map(|a| (ReferrerKind::Automation, a.id.as_str(), &a.referenced_entities))
            .chain(
                snapshot
                    .scripts
                    .iter()
                    .map(|s| (ReferrerKind::Script, s.id.as_str(), &s.referenced_entities)),
            )
            .chain(
                snapshot
                    .dashboards
                    .iter()
                    .map(|d| (ReferrerKind::Dashboard, d.id.as_str(), &d.referenced_entities)),
            );

        for (kind, referrer_id, mentions) in referrers {
            let referrer = graph.add_node(RefNode::Referrer(kind, referrer_id));
            for mention in mentions {
                let target = *entity_nodes
                    .entry(mention.as_str())
                    .or_insert_with(|| graph.add_node(RefNode::Entity(mention.as_str())));
                graph.update_edge(referrer, target, ());
            }
        }

        (graph, entity_nodes)
    }

    fn analyze(&self, snapshot: &Snapshot) -> (OrphanReport, Vec<Finding>) {
        let (graph, entity_nodes) = Self::build_reference_graph(snapshot);

        let mut considered = 0;
        let mut orphans: BTreeSet<String> = BTreeSet::new();
        for entity in &snapshot.entities {
            if self.is_excluded(&entity.entity_id) {
                continue;
            }
            considered += 1;
            let Some(&node) = entity_nodes.get(entity.entity_id.as_str()) else {
                continue;
            };
            if graph
                .neighbors_directed(node, Direction::Incoming)
                .next()
                .is_none()
            {
                orphans.insert(entity.entity_id.clone());
            }
        }

        let referenced = graph
            .node_indices()
            .filter(|n| matches!(graph[*n], RefNode::Entity(_)))
            .filter(|n| graph.neighbors_directed(*n, Direction::Incoming).next().is_some())
            .count();

        let mut orphans_by_domain: BTreeMap<String, usize> = BTreeMap::new();
        for id in &orphans {
            *orphans_by_domain.entry(entity_domain(id).to_string()).or_insert(0) += 1;
        }

        let orphans: Vec<String> = orphans.into_iter().collect();
        let orphan_percentage = if considered == 0 {
            0.0
        } else {
            round_one_decimal(orphans.len() as f64 * 100.0 / considered as f64)
        };

        let mut findings = Vec::new();
        if !orphans.is_empty() {
            let domains: Vec<String> = orphans_by_domain
                .iter()
                .map(|(d, n)| format!("{} {}", n, d))
                .collect();
            findings.push(Finding::new(
                DETECTOR_NAME,
                Category::Entities,
                Severity::Low,
                format!(
                    "{} entities ({:.1}%) are not referenced by any automation, script or dashboard ({})",
                    orphans.len(),
                    orphan_percentage,
                    domains.join(", ")
                ),
                orphans.clone(),
            ));
        }

        let report = OrphanReport {
            orphans,
            orphans_by_domain,
            orphan_percentage,
            considered_entities: considered,
            referenced_entities: referenced,
        };
        (report, findings)
    }
}

impl Default for OrphanEntityDetector {
    fn default() -> Self {
        Self::new(OrphanConfig::default())
    }
}

impl Detector for OrphanEntityDetector {
    fn name(&self) -> &'static str {
        DETECTOR_NAME
    }

    fn description(&self) -> &'static str {
        "Finds entities not referenced by any automation, script or dashboard"
    }

    fn category(&self) -> Category {
        Category::Entities
    }

    fn detect(&self, snapshot: &Snapshot) -> Result<DetectorOutput> {
        let (report, findings) = self.analyze(snapshot);
        debug!(
            "Orphans: {} of {} considered entities",
            report.orphans.len(),
            report.considered_entities
        );
        Ok(DetectorOutput::with_detail(findings, AnalysisDetail::Orphans(report)))
    }
}
