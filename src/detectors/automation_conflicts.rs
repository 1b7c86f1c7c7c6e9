//! Automation conflict detector
//!
//! Two classes of conflict:
//!
//! 1. **Contradictory overlap**: a pair of automations fires on the same
//!    trigger but drives a shared target into different states within the
//!    configured window. Checked pairwise, one finding per pair.
//! 2. **Trigger cycles**: automation A's actions satisfy B's trigger, B's
//!    satisfy C's, and so on back to A.
//!
//! # Cycle Algorithm
//!
//! The trigger graph is a petgraph `DiGraph`. Tarjan's SCC algorithm limits
//! the search to strongly connected components, then every elementary cycle
//! is enumerated once by rooting it at its smallest node index and only
//! extending paths through larger indices. Rotations therefore never
//! surface twice; `normalize_cycle` guards the remaining dedupe.

use crate::config::ConflictConfig;
use crate::detectors::base::{AnalysisDetail, Detector, DetectorOutput};
use crate::models::{Category, Finding, Severity};
use crate::telemetry::{Action, AutomationRecord, Snapshot, Trigger, TriggerPlatform};
use anyhow::Result;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, warn};

const DETECTOR_NAME: &str = "automation_conflicts";

/// Two automations that fight over one target
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContradictoryPair {
    pub first: String,
    pub second: String,
    /// The shared trigger, e.g. `binary_sensor.door → on`
    pub trigger: String,
    pub target: String,
    pub first_state: String,
    pub second_state: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConflictReport {
    pub contradictory_pairs: Vec<ContradictoryPair>,
    /// Each cycle lists automation ids in firing order, without repeating
    /// the first at the end
    pub cycles: Vec<Vec<String>>,
    /// Cycle enumeration stopped at `max_cycles`
    pub cycles_truncated: bool,
}

/// Detects contradictory and looping automations
pub struct AutomationConflictDetector {
    config: ConflictConfig,
}

impl AutomationConflictDetector {
    pub fn new(config: ConflictConfig) -> Self {
        Self { config }
    }

    /// States both criteria accept; `None` when neither side constrains
    fn shared_states<'a>(a: &'a [String], b: &'a [String]) -> Option<Vec<&'a str>> {
        match (a.is_empty(), b.is_empty()) {
            (true, true) => None,
            (false, true) => Some(a.iter().map(String::as_str).collect()),
            (true, false) => Some(b.iter().map(String::as_str).collect()),
            (false, false) => Some(
                a.iter()
                    .filter(|state| b.contains(state))
                    .map(String::as_str)
                    .collect(),
            ),
        }
    }

    /// New states for which one change `old → new` fires both triggers, or
    /// `None` when no single change can. An empty list means any new state.
    ///
    /// State triggers only fire on an actual change, so `old != new`.
    fn shared_transition<'a>(a: &'a Trigger, b: &'a Trigger) -> Option<Vec<&'a str>> {
        let to = Self::shared_states(&a.to, &b.to);
        let from = Self::shared_states(&a.from, &b.from);
        if to.as_ref().is_some_and(Vec::is_empty) || from.as_ref().is_some_and(Vec::is_empty) {
            return None;
        }
        if let (Some([new]), Some([old])) = (to.as_deref(), from.as_deref()) {
            if new == old {
                return None;
            }
        }
        Some(to.unwrap_or_default())
    }

    /// Open intervals `(above, below)` intersect
    fn ranges_intersect(a: &Trigger, b: &Trigger) -> bool {
        let low = a
            .above
            .unwrap_or(f64::NEG_INFINITY)
            .max(b.above.unwrap_or(f64::NEG_INFINITY));
        let high = a
            .below
            .unwrap_or(f64::INFINITY)
            .min(b.below.unwrap_or(f64::INFINITY));
        low < high
    }

    /// Describe the overlap between two triggers, if they can fire together
    fn trigger_overlap(a: &Trigger, b: &Trigger) -> Option<String> {
        if a.platform != b.platform {
            return None;
        }

        if a.entity_ids.is_empty() && b.entity_ids.is_empty() {
            return match (&a.at, &b.at) {
                (Some(x), Some(y)) if x == y => Some(format!("{} {}", platform_label(&a.platform), x)),
                _ => None,
            };
        }

        let shared = a.entity_ids.iter().find(|e| b.entity_ids.contains(e))?;
        if a.platform == TriggerPlatform::NumericState {
            return Self::ranges_intersect(a, b).then(|| format!("{} (numeric range)", shared));
        }

        let new_states = Self::shared_transition(a, b)?;
        Some(match new_states.first() {
            Some(state) => format!("{} → {}", shared, state),
            None => format!("{} (any change)", shared),
        })
    }

    /// A target both automations set to different known states in the window
    fn contradictory_actions<'a>(&self, a: &'a [Action], b: &'a [Action]) -> Option<(&'a str, String, String)> {
        for action_a in a {
            let Some(state_a) = action_a.resulting_state() else {
                continue;
            };
            for action_b in b {
                if action_a.offset_secs.abs_diff(action_b.offset_secs) > self.config.window_seconds {
                    continue;
                }
                let Some(state_b) = action_b.resulting_state() else {
                    continue;
                };
                if state_a == state_b {
                    continue;
                }
                if let Some(target) = action_a.targets.iter().find(|t| action_b.targets.contains(t)) {
                    return Some((target.as_str(), state_a, state_b));
                }
            }
        }
        None
    }

    fn find_contradictory_pairs(&self, automations: &[AutomationRecord]) -> Vec<ContradictoryPair> {
        let mut pairs = Vec::new();
        for (i, first) in automations.iter().enumerate() {
            for second in &automations[i + 1..] {
                let trigger = first
                    .triggers
                    .iter()
                    .flat_map(|ta| second.triggers.iter().map(move |tb| (ta, tb)))
                    .find_map(|(ta, tb)| Self::trigger_overlap(ta, tb));
                let Some(trigger) = trigger else { continue };

                if let Some((target, first_state, second_state)) =
                    self.contradictory_actions(&first.actions, &second.actions)
                {
                    pairs.push(ContradictoryPair {
                        first: first.id.clone(),
                        second: second.id.clone(),
                        trigger,
                        target: target.to_string(),
                        first_state,
                        second_state,
                    });
                }
            }
        }
        pairs
    }

    /// Whether running `action` can fire `trigger`
    fn action_satisfies(action: &Action, trigger: &Trigger) -> bool {
        if trigger.platform != TriggerPlatform::State {
            return false;
        }
        if !action.targets.iter().any(|t| trigger.entity_ids.contains(t)) {
            return false;
        }
        trigger.to.is_empty()
            || action
                .resulting_state()
                .is_some_and(|state| trigger.to.contains(&state))
    }

    /// Directed trigger graph; self-loops are left out
    fn build_trigger_graph(automations: &[AutomationRecord]) -> DiGraph<usize, ()> {
        let mut graph = DiGraph::with_capacity(automations.len(), 0);
        let nodes: Vec<NodeIndex> = (0..automations.len()).map(|i| graph.add_node(i)).collect();

        for (i, source) in automations.iter().enumerate() {
            for (j, target) in automations.iter().enumerate() {
                if i == j {
                    continue;
                }
                let fires = source.actions.iter().any(|action| {
                    target
                        .triggers
                        .iter()
                        .any(|trigger| Self::action_satisfies(action, trigger))
                });
                if fires {
                    graph.add_edge(nodes[i], nodes[j], ());
                }
            }
        }
        graph
    }

    /// Rotate a cycle to start at its smallest element
    fn normalize_cycle(cycle: &[String]) -> Vec<String> {
        if cycle.is_empty() {
            return vec![];
        }

        let min_idx = cycle
            .iter()
            .enumerate()
            .min_by_key(|(_, v)| *v)
            .map(|(i, _)| i)
            .unwrap_or(0);

        let mut normalized = Vec::with_capacity(cycle.len());
        normalized.extend_from_slice(&cycle[min_idx..]);
        normalized.extend_from_slice(&cycle[..min_idx]);
        normalized
    }

    /// Elementary cycles of length ≥ 2, as node index lists
    fn find_cycles(&self, graph: &DiGraph<usize, ()>) -> (Vec<Vec<usize>>, bool) {
        let mut component = vec![usize::MAX; graph.node_count()];
        for (c, scc) in tarjan_scc(graph).into_iter().enumerate() {
            if scc.len() > 1 {
                for node in scc {
                    component[node.index()] = c;
                }
            }
        }

        let mut cycles = Vec::new();
        let mut truncated = false;
        for start in graph.node_indices() {
            if component[start.index()] == usize::MAX {
                continue;
            }
            let mut path = vec![start];
            let mut on_path = HashSet::from([start]);
            if !self.extend_cycles(graph, &component, start, &mut path, &mut on_path, &mut cycles) {
                truncated = true;
                break;
            }
        }
        (cycles, truncated)
    }

    /// Depth-first extension from the end of `path`. Returns false once the
    /// cycle cap is reached.
    fn extend_cycles(
        &self,
        graph: &DiGraph<usize, ()>,
        component: &[usize],
        start: NodeIndex,
        path: &mut Vec<NodeIndex>,
        on_path: &mut HashSet<NodeIndex>,
        cycles: &mut Vec<Vec<usize>>,
    ) -> bool {
        let Some(&current) = path.last() else {
            return true;
        };

        let mut successors: Vec<NodeIndex> = graph.neighbors(current).collect();
        successors.sort();
        successors.dedup();

        for next in successors {
            if next == start {
                if cycles.len() >= self.config.max_cycles {
                    return false;
                }
                cycles.push(path.iter().map(|n| graph[*n]).collect());
                continue;
            }
            if next < start
                || component[next.index()] != component[start.index()]
                || on_path.contains(&next)
            {
                continue;
            }
            path.push(next);
            on_path.insert(next);
            let keep_going = self.extend_cycles(graph, component, start, path, on_path, cycles);
            on_path.remove(&next);
            path.pop();
            if !keep_going {
                return false;
            }
        }
        true
    }

    fn analyze(&self, automations: &[AutomationRecord]) -> (ConflictReport, Vec<Finding>) {
        let mut findings = Vec::new();

        let contradictory_pairs = self.find_contradictory_pairs(automations);
        for pair in &contradictory_pairs {
            findings.push(Finding::new(
                DETECTOR_NAME,
                Category::Automations,
                Severity::Medium,
                format!(
                    "Automations '{}' and '{}' both trigger on {} but set {} to '{}' and '{}'",
                    pair.first, pair.second, pair.trigger, pair.target, pair.first_state, pair.second_state
                ),
                vec![pair.first.clone(), pair.second.clone(), pair.target.clone()],
            ));
        }

        let graph = Self::build_trigger_graph(automations);
        debug!(
            "Trigger graph: {} automations, {} edges",
            graph.node_count(),
            graph.edge_count()
        );
        let (raw_cycles, cycles_truncated) = self.find_cycles(&graph);
        if cycles_truncated {
            warn!(
                "Stopped trigger cycle search at {} cycles",
                self.config.max_cycles
            );
        }

        let mut seen: BTreeSet<Vec<String>> = BTreeSet::new();
        let mut cycles = Vec::new();
        for raw in raw_cycles {
            let ids: Vec<String> = raw.iter().map(|&i| automations[i].id.clone()).collect();
            let normalized = Self::normalize_cycle(&ids);
            if !seen.insert(normalized.clone()) {
                continue;
            }

            let mut display = normalized.clone();
            display.push(normalized[0].clone());
            findings.push(Finding::new(
                DETECTOR_NAME,
                Category::Automations,
                Severity::High,
                format!(
                    "Automation trigger loop of {} automations: {}",
                    normalized.len(),
                    display.join(" → ")
                ),
                normalized.clone(),
            ));
            cycles.push(normalized);
        }

        let report = ConflictReport {
            contradictory_pairs,
            cycles,
            cycles_truncated,
        };
        (report, findings)
    }
}

fn platform_label(platform: &TriggerPlatform) -> &str {
    match platform {
        TriggerPlatform::State => "state",
        TriggerPlatform::NumericState => "numeric_state",
        TriggerPlatform::Time => "time",
        TriggerPlatform::Event => "event",
        TriggerPlatform::Other(name) => name.as_str(),
    }
}

impl Default for AutomationConflictDetector {
    fn default() -> Self {
        Self::new(ConflictConfig::default())
    }
}

impl Detector for AutomationConflictDetector {
    fn name(&self) -> &'static str {
        DETECTOR_NAME
    }

    fn description(&self) -> &'static str {
        "Detects automations with contradictory actions and trigger loops"
    }

    fn category(&self) -> Category {
        Category::Automations
    }

    fn detect(&self, snapshot: &Snapshot) -> Result<DetectorOutput> {
        let (report, findings) = self.analyze(&snapshot.automations);
        debug!(
            "Conflicts: {} contradictory pairs, {} cycles",
            report.contradictory_pairs.len(),
            report.cycles.len()
        );
        Ok(DetectorOutput::with_detail(findings, AnalysisDetail::Conflicts(report)))
    }
}
