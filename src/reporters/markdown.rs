//! Markdown reporter for GitHub-flavored Markdown output
//!
//! Generates reports suitable for:
//! - Issue and forum posts
//! - Wiki pages
//! - Change logs kept next to a configuration repository
//!
//! Output depends only on the run and its history, never on the clock, so
//! the same snapshot always renders the same document.

use super::truncated_list;
use crate::history::SnapshotHistory;
use crate::models::{Category, Finding, HealthLabel, HealthReport, Severity};
use crate::pipeline::{DiagnosticRun, RunDetails};
use anyhow::Result;

/// Maximum findings to show per category
const MAX_FINDINGS_PER_CATEGORY: usize = 20;

/// Affected entities listed per finding before collapsing
const MAX_AFFECTED: usize = 10;

/// Render run as GitHub-flavored Markdown
pub fn render(run: &DiagnosticRun, history: &SnapshotHistory) -> Result<String> {
    let report = &run.report;
    let mut md = String::new();

    md.push_str(&render_header(report, history));
    md.push('\n');

    md.push_str(&render_summary(report));
    md.push('\n');

    md.push_str(&render_findings(report));

    let details = render_details(&run.details);
    if !details.is_empty() {
        md.push_str(&details);
        md.push('\n');
    }

    md.push_str(&render_footer(report));

    Ok(md)
}

fn render_header(report: &HealthReport, history: &SnapshotHistory) -> String {
    let label_emoji = match report.overall_label {
        HealthLabel::Excellent => "🏆",
        HealthLabel::Good => "✅",
        HealthLabel::Fair => "⚠️",
        HealthLabel::Poor => "❌",
    };

    let mut header = format!(
        "# Home Health Report\n\n**Score: {:.1}/100** {} {}\n",
        report.overall_score,
        label_emoji,
        report.overall_label.as_str()
    );

    if let Some(latest) = history.latest() {
        header.push_str(&format!(
            "\n*Snapshot captured {}*\n",
            latest.captured_at.format("%Y-%m-%d %H:%M UTC")
        ));
    }
    if let (Some(delta), Some(previous)) = (history.score_delta(), history.previous()) {
        let arrow = if delta > 0.0 {
            "📈"
        } else if delta < 0.0 {
            "📉"
        } else {
            "➡️"
        };
        header.push_str(&format!(
            "\n{} **Trend:** {:+.1} since {} (was {:.1})\n",
            arrow,
            delta,
            previous.captured_at.format("%Y-%m-%d %H:%M UTC"),
            previous.overall_score
        ));
    }

    header
}

fn render_summary(report: &HealthReport) -> String {
    let mut section = String::from("## Summary\n\n");

    section.push_str("| Severity | Count |\n");
    section.push_str("|----------|------:|\n");
    for severity in Severity::ALL {
        section.push_str(&format!(
            "| {} {} | {} |\n",
            severity_emoji(severity),
            capitalize(severity.as_str()),
            report.severity_counts.get(severity)
        ));
    }
    section.push_str(&format!("| **Total** | **{}** |\n\n", report.total_issues));

    section.push_str("| Category | Issues |\n");
    section.push_str("|----------|-------:|\n");
    for category in Category::ALL {
        section.push_str(&format!(
            "| {} | {} |\n",
            category.title(),
            report.category_counts.get(&category).copied().unwrap_or(0)
        ));
    }

    section
}

fn render_findings(report: &HealthReport) -> String {
    if report.findings.is_empty() {
        return "## Findings\n\n✨ No issues found.\n\n".to_string();
    }

    let mut section = String::from("## Findings\n\n");
    for category in Category::ALL {
        let findings: Vec<&Finding> = report.findings_in(category).collect();
        if findings.is_empty() {
            continue;
        }

        section.push_str(&format!("### {} ({})\n\n", category.title(), findings.len()));
        for finding in findings.iter().take(MAX_FINDINGS_PER_CATEGORY) {
            section.push_str(&render_finding(finding));
        }
        if findings.len() > MAX_FINDINGS_PER_CATEGORY {
            section.push_str(&format!(
                "\n*... and {} more*\n",
                findings.len() - MAX_FINDINGS_PER_CATEGORY
            ));
        }
        section.push('\n');
    }

    section
}

fn render_finding(finding: &Finding) -> String {
    let mut line = format!(
        "- {} **{}** {}",
        severity_emoji(finding.severity()),
        capitalize(finding.severity().as_str()),
        finding.description()
    );
    if !finding.affected_entities().is_empty() {
        line.push_str(&format!(
            "  \n  Affects: `{}`",
            truncated_list(finding.affected_entities(), MAX_AFFECTED)
        ));
    }
    line.push('\n');
    line
}

fn render_details(details: &RunDetails) -> String {
    let mut section = String::new();

    if let Some(mesh) = &details.mesh {
        section.push_str("### Zigbee Mesh\n\n");
        section.push_str("| Metric | Value |\n|--------|-------|\n");
        section.push_str(&format!("| Devices | {} |\n", mesh.device_count));
        section.push_str(&format!("| Links | {} |\n", mesh.link_count));
        section.push_str(&format!("| Average LQI | {} |\n", optional(mesh.average_lqi, "")));
        section.push_str(&format!("| Average RSSI | {} |\n", optional(mesh.average_rssi, " dBm")));
        section.push_str(&format!("| Weak links | {} |\n", mesh.weak_links));
        section.push_str(&format!(
            "| Routers / end devices | {} / {} |\n",
            mesh.router_count, mesh.end_device_count
        ));
        section.push_str(&format!("| Partitions | {} |\n", mesh.partitions));
        section.push_str(&format!("| Mesh score | {:.1} |\n\n", mesh.mesh_score));

        let h = &mesh.lqi_histogram;
        section.push_str(&format!(
            "LQI distribution: excellent {}, good {}, fair {}, poor {}, critical {}\n\n",
            h.excellent, h.good, h.fair, h.poor, h.critical
        ));
    }

    if let Some(orphans) = &details.orphans {
        section.push_str("### Orphan Entities\n\n");
        section.push_str(&format!(
            "{} of {} entities ({:.1}%) are not referenced by any automation, script or dashboard.\n\n",
            orphans.orphans.len(),
            orphans.considered_entities,
            orphans.orphan_percentage
        ));
        if !orphans.orphans_by_domain.is_empty() {
            section.push_str("| Domain | Orphans |\n|--------|--------:|\n");
            for (domain, count) in &orphans.orphans_by_domain {
                section.push_str(&format!("| `{}` | {} |\n", domain, count));
            }
            section.push('\n');
        }
    }

    if let Some(conflicts) = &details.conflicts {
        if !conflicts.contradictory_pairs.is_empty() || !conflicts.cycles.is_empty() {
            section.push_str("### Automation Conflicts\n\n");
            for pair in &conflicts.contradictory_pairs {
                section.push_str(&format!(
                    "- `{}` sets `{}` to `{}` while `{}` sets it to `{}` (trigger `{}`)\n",
                    pair.first, pair.target, pair.first_state, pair.second, pair.second_state, pair.trigger
                ));
            }
            for cycle in &conflicts.cycles {
                let mut path: Vec<&str> = cycle.iter().map(String::as_str).collect();
                if let Some(first) = cycle.first() {
                    path.push(first);
                }
                section.push_str(&format!("- Loop: {}\n", path.join(" → ")));
            }
            if conflicts.cycles_truncated {
                section.push_str("- *Loop enumeration stopped early*\n");
            }
            section.push('\n');
        }
    }

    if let Some(energy) = &details.energy {
        section.push_str("### Energy\n\n");
        section.push_str(&format!(
            "{:.2} kWh between {} and {}, estimated cost {:.2} at {:.2} per kWh.\n\n",
            energy.total_kwh,
            energy.window_start.format("%Y-%m-%d %H:%M"),
            energy.window_end.format("%Y-%m-%d %H:%M"),
            energy.estimated_cost,
            energy.cost_per_kwh
        ));
        if !energy.top_consumers.is_empty() {
            section.push_str("| Device | kWh |\n|--------|----:|\n");
            for consumer in &energy.top_consumers {
                section.push_str(&format!("| `{}` | {:.2} |\n", consumer.entity_id, consumer.kwh));
            }
            section.push('\n');
        }
    }

    if section.is_empty() {
        return section;
    }
    format!("## Details\n\n{}", section)
}

fn render_footer(report: &HealthReport) -> String {
    let performed = if report.diagnostics_performed.is_empty() {
        "none".to_string()
    } else {
        report
            .diagnostics_performed
            .iter()
            .map(|d| format!("`{}`", d))
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!("---\n\n*Diagnostics performed: {}*\n", performed)
}

fn optional(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{:.1}{}", v, unit),
        None => "n/a".to_string(),
    }
}

fn severity_emoji(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "🔴",
        Severity::High => "🟠",
        Severity::Medium => "🟡",
        Severity::Low => "🔵",
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
    }
}
