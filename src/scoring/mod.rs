//! Severity-weighted health scoring
//!
//! The score is a pure fold over findings; both the weights and the label
//! bands are data, not branching logic.
//!
//! # Scoring Formula
//!
//! ```text
//! score = max(0, 100 - Σ weight(finding.severity))
//!
//!   critical 25   high 10   medium 4   low 1
//! ```
//!
//! # Label Bands
//!
//! ```text
//! ≥ 90 EXCELLENT   ≥ 70 GOOD   ≥ 50 FAIR   otherwise POOR
//! ```

mod health_scorer;

pub use health_scorer::HealthScorer;

use crate::models::{Finding, HealthLabel, Severity};

/// Points subtracted per finding of each severity
pub const SEVERITY_WEIGHTS: [(Severity, f64); 4] = [
    (Severity::Critical, 25.0),
    (Severity::High, 10.0),
    (Severity::Medium, 4.0),
    (Severity::Low, 1.0),
];

/// Lower bound of each label band, highest first
pub const LABEL_BANDS: [(f64, HealthLabel); 4] = [
    (90.0, HealthLabel::Excellent),
    (70.0, HealthLabel::Good),
    (50.0, HealthLabel::Fair),
    (0.0, HealthLabel::Poor),
];

pub const MAX_SCORE: f64 = 100.0;

pub fn severity_weight(severity: Severity) -> f64 {
    SEVERITY_WEIGHTS
        .iter()
        .find(|(s, _)| *s == severity)
        .map(|(_, w)| *w)
        .unwrap_or(0.0)
}

pub fn label_for(score: f64) -> HealthLabel {
    LABEL_BANDS
        .iter()
        .find(|(floor, _)| score >= *floor)
        .map(|(_, label)| *label)
        .unwrap_or(HealthLabel::Poor)
}

/// `max(0, 100 - Σ weights)`, rounded to one decimal
pub fn score_findings<'a>(findings: impl IntoIterator<Item = &'a Finding>) -> f64 {
    let penalty: f64 = findings
        .into_iter()
        .map(|f| severity_weight(f.severity()))
        .sum();
    round_one_decimal((MAX_SCORE - penalty).max(0.0))
}

pub(crate) fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;

    fn finding(severity: Severity, n: usize) -> Finding {
        Finding::new("t", Category::Entities, severity, format!("f{}", n), vec![])
    }

    #[test]
    fn test_weights_table() {
        assert_eq!(severity_weight(Severity::Critical), 25.0);
        assert_eq!(severity_weight(Severity::High), 10.0);
        assert_eq!(severity_weight(Severity::Medium), 4.0);
        assert_eq!(severity_weight(Severity::Low), 1.0);
    }

    #[test]
    fn test_label_band_edges() {
        assert_eq!(label_for(100.0), HealthLabel::Excellent);
        assert_eq!(label_for(90.0), HealthLabel::Excellent);
        assert_eq!(label_for(89.9), HealthLabel::Good);
        assert_eq!(label_for(70.0), HealthLabel::Good);
        assert_eq!(label_for(69.9), HealthLabel::Fair);
        assert_eq!(label_for(50.0), HealthLabel::Fair);
        assert_eq!(label_for(49.9), HealthLabel::Poor);
        assert_eq!(label_for(0.0), HealthLabel::Poor);
    }

    #[test]
    fn test_score_is_floored_at_zero() {
        let findings: Vec<_> = (0..5).map(|i| finding(Severity::Critical, i)).collect();
        assert_eq!(score_findings(&findings), 0.0);
    }

    #[test]
    fn test_score_matches_weight_sum() {
        for critical in 0..3 {
            for high in 0..4 {
                for medium in 0..3 {
                    for low in 0..3 {
                        let mut findings = Vec::new();
                        let mut n = 0;
                        for (severity, count) in [
                            (Severity::Critical, critical),
                            (Severity::High, high),
                            (Severity::Medium, medium),
                            (Severity::Low, low),
                        ] {
                            for _ in 0..count {
                                findings.push(finding(severity, n));
                                n += 1;
                            }
                        }
                        let expected = (100.0
                            - 25.0 * critical as f64
                            - 10.0 * high as f64
                            - 4.0 * medium as f64
                            - low as f64)
                            .max(0.0);
                        assert_eq!(score_findings(&findings), expected);
                    }
                }
            }
        }
    }
}
