//! Core data models for homediag
//!
//! These models are shared by every analyzer, the scorer and the reporters:
//! the `Finding` value object, its `Severity`/`Category` tags, and the
//! `HealthReport` produced once per diagnostic run.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Generate a deterministic finding ID based on content hash.
///
/// The ID is a 16-character hex string derived from hashing the category,
/// severity, description and affected entities, so identical snapshots
/// produce identical IDs across runs and processes.
pub fn deterministic_finding_id(
    category: Category,
    severity: Severity,
    description: &str,
    affected: &[String],
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(category.as_str().as_bytes());
    hasher.update(b"\n");
    hasher.update(severity.as_str().as_bytes());
    hasher.update(b"\n");
    hasher.update(description.as_bytes());
    for entity in affected {
        hasher.update(b"\n");
        hasher.update(entity.as_bytes());
    }
    let digest = hasher.finalize();
    digest[..8].iter().map(|b| format!("{:02x}", b)).collect()
}

/// Severity levels for findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// All severities, most severe first
    pub const ALL: [Severity; 4] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Finding categories.
///
/// Variant order is the canonical report order; `Ord` follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Entities,
    Batteries,
    LogsErrors,
    Updates,
    Mesh,
    Automations,
    Energy,
}

impl Category {
    /// All categories in canonical report order
    pub const ALL: [Category; 7] = [
        Category::Entities,
        Category::Batteries,
        Category::LogsErrors,
        Category::Updates,
        Category::Mesh,
        Category::Automations,
        Category::Energy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Entities => "entities",
            Category::Batteries => "batteries",
            Category::LogsErrors => "logs_errors",
            Category::Updates => "updates",
            Category::Mesh => "mesh",
            Category::Automations => "automations",
            Category::Energy => "energy",
        }
    }

    /// Human-readable title for reports
    pub fn title(&self) -> &'static str {
        match self {
            Category::Entities => "Entities",
            Category::Batteries => "Batteries",
            Category::LogsErrors => "Logs & Errors",
            Category::Updates => "Updates",
            Category::Mesh => "Zigbee Mesh",
            Category::Automations => "Automations",
            Category::Energy => "Energy",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single diagnostic observation.
///
/// Findings are built once by an analyzer and only read afterwards; there
/// are no setters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    id: String,
    detector: String,
    category: Category,
    severity: Severity,
    description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    affected_entities: Vec<String>,
}

impl Finding {
    pub fn new(
        detector: impl Into<String>,
        category: Category,
        severity: Severity,
        description: impl Into<String>,
        affected_entities: Vec<String>,
    ) -> Self {
        let description = description.into();
        let id = deterministic_finding_id(category, severity, &description, &affected_entities);
        Self {
            id,
            detector: detector.into(),
            category,
            severity,
            description,
            affected_entities,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn detector(&self) -> &str {
        &self.detector
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn affected_entities(&self) -> &[String] {
        &self.affected_entities
    }
}

/// Summary of findings by severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl SeverityCounts {
    pub fn from_findings(findings: &[Finding]) -> Self {
        let mut counts = Self::default();
        for f in findings {
            match f.severity() {
                Severity::Critical => counts.critical += 1,
                Severity::High => counts.high += 1,
                Severity::Medium => counts.medium += 1,
                Severity::Low => counts.low += 1,
            }
        }
        counts
    }

    pub fn get(&self, severity: Severity) -> usize {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
        }
    }
}

/// Score band label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthLabel {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl HealthLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthLabel::Excellent => "EXCELLENT",
            HealthLabel::Good => "GOOD",
            HealthLabel::Fair => "FAIR",
            HealthLabel::Poor => "POOR",
        }
    }
}

impl std::fmt::Display for HealthLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overall health report for one telemetry snapshot.
///
/// Built by `HealthScorer::score`; the field order here is the JSON key order
/// consumed by presentation layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub overall_score: f64,
    pub overall_label: HealthLabel,
    pub total_issues: usize,
    pub severity_counts: SeverityCounts,
    pub category_counts: BTreeMap<Category, usize>,
    pub findings: Vec<Finding>,
    pub diagnostics_performed: Vec<String>,
}

impl HealthReport {
    /// Findings belonging to one category, in report order
    pub fn findings_in(&self, category: Category) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(move |f| f.category() == category)
    }
}
