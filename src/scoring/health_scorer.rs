//! Folds analyzer findings into a `HealthReport`

use super::{label_for, score_findings};
use crate::models::{Category, Finding, HealthReport, SeverityCounts};
use std::cmp::Reverse;
use std::collections::BTreeMap;
use tracing::debug;

/// Stateless scorer; one call per diagnostic run
#[derive(Debug, Clone, Copy, Default)]
pub struct HealthScorer;

impl HealthScorer {
    pub fn new() -> Self {
        Self
    }

    /// Build the report for one run.
    ///
    /// Findings are grouped by canonical category order, then by descending
    /// severity; remaining ties fall back to description and affected
    /// entities so identical input always yields identical output.
    pub fn score(&self, mut findings: Vec<Finding>, diagnostics_performed: Vec<String>) -> HealthReport {
        findings.sort_by(|a, b| {
            (a.category(), Reverse(a.severity()), a.description(), a.affected_entities()).cmp(&(
                b.category(),
                Reverse(b.severity()),
                b.description(),
                b.affected_entities(),
            ))
        });

        let overall_score = score_findings(&findings);
        let overall_label = label_for(overall_score);

        let mut category_counts: BTreeMap<Category, usize> =
            Category::ALL.iter().map(|c| (*c, 0)).collect();
        for finding in &findings {
            *category_counts.entry(finding.category()).or_insert(0) += 1;
        }

        debug!(
            "Scored {} findings: {:.1} ({})",
            findings.len(),
            overall_score,
            overall_label
        );

        HealthReport {
            overall_score,
            overall_label,
            total_issues: findings.len(),
            severity_counts: SeverityCounts::from_findings(&findings),
            category_counts,
            findings,
            diagnostics_performed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HealthLabel, Severity};

    #[test]
    fn test_no_findings_is_excellent() {
        let report = HealthScorer::new().score(vec![], vec!["mesh_topology".into()]);
        assert_eq!(report.overall_score, 100.0);
        assert_eq!(report.overall_label, HealthLabel::Excellent);
        assert_eq!(report.total_issues, 0);
        assert_eq!(report.category_counts.len(), Category::ALL.len());
        assert!(report.category_counts.values().all(|c| *c == 0));
    }

    #[test]
    fn test_canonical_ordering() {
        let findings = vec![
            Finding::new("e", Category::Energy, Severity::Low, "energy", vec![]),
            Finding::new("m", Category::Mesh, Severity::Medium, "weak", vec![]),
            Finding::new("m", Category::Mesh, Severity::High, "orphan b", vec![]),
            Finding::new("m", Category::Mesh, Severity::High, "orphan a", vec![]),
            Finding::new("x", Category::Entities, Severity::Low, "stale", vec![]),
        ];
        let report = HealthScorer::new().score(findings, vec![]);
        let order: Vec<_> = report.findings.iter().map(|f| f.description()).collect();
        assert_eq!(order, vec!["stale", "orphan a", "orphan b", "weak", "energy"]);
        assert_eq!(report.overall_score, 100.0 - 1.0 - 10.0 - 10.0 - 4.0 - 1.0);
        assert_eq!(report.overall_label, HealthLabel::Good);
        assert_eq!(report.category_counts[&Category::Mesh], 3);
        assert_eq!(report.severity_counts.high, 2);
    }

    #[test]
    fn test_ordering_is_input_order_independent() {
        let a = Finding::new("a", Category::Automations, Severity::Medium, "pair 1", vec![]);
        let b = Finding::new("a", Category::Automations, Severity::Medium, "pair 2", vec![]);
        let first = HealthScorer::new().score(vec![a.clone(), b.clone()], vec![]);
        let second = HealthScorer::new().score(vec![b, a], vec![]);
        assert_eq!(first, second);
    }
}
