//! Text (terminal) reporter with colors and formatting
//!
//! Colors come from `console`, which drops them when stdout is not a
//! terminal or `NO_COLOR` is set.

use super::truncated_list;
use crate::history::SnapshotHistory;
use crate::models::{Category, HealthLabel, Severity};
use crate::pipeline::{DiagnosticRun, RunDetails};
use anyhow::Result;
use console::{style, StyledObject};

/// Affected entities listed per finding before collapsing
const MAX_AFFECTED: usize = 5;

fn label_style(label: HealthLabel) -> StyledObject<&'static str> {
    let s = style(label.as_str()).bold();
    match label {
        HealthLabel::Excellent => s.green(),
        HealthLabel::Good => s.green().bright(),
        HealthLabel::Fair => s.yellow(),
        HealthLabel::Poor => s.red(),
    }
}

fn severity_tag(severity: Severity) -> StyledObject<&'static str> {
    match severity {
        Severity::Critical => style("[C]").red().bold(),
        Severity::High => style("[H]").red().bright(),
        Severity::Medium => style("[M]").yellow(),
        Severity::Low => style("[L]").blue(),
    }
}

/// Render run as formatted terminal output
pub fn render(run: &DiagnosticRun, history: &SnapshotHistory) -> Result<String> {
    let report = &run.report;
    let mut out = String::new();

    // Header
    out.push_str(&format!("\n{}\n", style("Home Health Report").bold()));
    out.push_str(&format!(
        "{}\n",
        style("──────────────────────────────────────").dim()
    ));
    out.push_str(&format!(
        "Score: {}  Status: {}  Issues: {}\n",
        style(format!("{:.1}/100", report.overall_score)).bold(),
        label_style(report.overall_label),
        report.total_issues
    ));
    if let Some(trend) = trend_line(history) {
        out.push_str(&trend);
        out.push('\n');
    }
    out.push('\n');

    // Severity summary
    let counts = &report.severity_counts;
    let mut parts = Vec::new();
    for severity in Severity::ALL {
        let n = counts.get(severity);
        if n > 0 {
            parts.push(format!("{} {} {}", severity_tag(severity), n, severity));
        }
    }
    if parts.is_empty() {
        out.push_str(&format!("{}\n\n", style("No issues found").green()));
    } else {
        out.push_str(&format!("{}  {}\n\n", style("ISSUES").bold(), parts.join("  ")));
    }

    // Findings grouped by category
    for category in Category::ALL {
        let mut findings = report.findings_in(category).peekable();
        if findings.peek().is_none() {
            continue;
        }
        out.push_str(&format!(
            "{} ({})\n",
            style(category.title().to_uppercase()).bold(),
            report.category_counts.get(&category).copied().unwrap_or(0)
        ));
        for finding in findings {
            out.push_str(&format!(
                "  {} {}\n",
                severity_tag(finding.severity()),
                finding.description()
            ));
            if !finding.affected_entities().is_empty() {
                out.push_str(&format!(
                    "      {}\n",
                    style(format!(
                        "affects: {}",
                        truncated_list(finding.affected_entities(), MAX_AFFECTED)
                    ))
                    .dim()
                ));
            }
        }
        out.push('\n');
    }

    out.push_str(&render_details(&run.details));

    out.push_str(&format!(
        "{}\n",
        style(format!(
            "Diagnostics: {}",
            if report.diagnostics_performed.is_empty() {
                "none".to_string()
            } else {
                report.diagnostics_performed.join(", ")
            }
        ))
        .dim()
    ));

    Ok(out)
}

fn trend_line(history: &SnapshotHistory) -> Option<String> {
    let delta = history.score_delta()?;
    let previous = history.previous()?;
    let arrow = if delta > 0.0 {
        style(format!("▲ +{:.1}", delta)).green()
    } else if delta < 0.0 {
        style(format!("▼ {:.1}", delta)).red()
    } else {
        style("= 0.0".to_string()).dim()
    };
    Some(format!(
        "Trend: {} since {} (was {:.1})",
        arrow,
        previous.captured_at.format("%Y-%m-%d %H:%M UTC"),
        previous.overall_score
    ))
}

fn render_details(details: &RunDetails) -> String {
    let mut out = String::new();

    if let Some(mesh) = &details.mesh {
        let mut line = format!(
            "{}  devices {}  links {}",
            style("MESH").bold(),
            mesh.device_count,
            mesh.link_count
        );
        if let Some(lqi) = mesh.average_lqi {
            line.push_str(&format!("  avg LQI {:.1}", lqi));
        }
        if let Some(rssi) = mesh.average_rssi {
            line.push_str(&format!("  avg RSSI {:.1} dBm", rssi));
        }
        line.push_str(&format!(
            "  weak {}  partitions {}  score {:.1}\n",
            mesh.weak_links, mesh.partitions, mesh.mesh_score
        ));
        out.push_str(&line);
    }

    if let Some(orphans) = &details.orphans {
        out.push_str(&format!(
            "{}  {} of {} entities unreferenced ({:.1}%)\n",
            style("ORPHANS").bold(),
            orphans.orphans.len(),
            orphans.considered_entities,
            orphans.orphan_percentage
        ));
    }

    if let Some(conflicts) = &details.conflicts {
        out.push_str(&format!(
            "{}  contradictory pairs {}  trigger loops {}{}\n",
            style("AUTOMATIONS").bold(),
            conflicts.contradictory_pairs.len(),
            conflicts.cycles.len(),
            if conflicts.cycles_truncated { "+" } else { "" }
        ));
    }

    if let Some(energy) = &details.energy {
        out.push_str(&format!(
            "{}  {:.2} kWh  est. cost {:.2}",
            style("ENERGY").bold(),
            energy.total_kwh,
            energy.estimated_cost
        ));
        if let Some(top) = energy.top_consumers.first() {
            out.push_str(&format!("  top {} ({:.2} kWh)", top.entity_id, top.kwh));
        }
        out.push('\n');
    }

    if !out.is_empty() {
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporters::tests::{test_history, test_run};

    fn plain(s: &str) -> String {
        console::strip_ansi_codes(s).into_owned()
    }

    #[test]
    fn test_render_contains_header_and_score() {
        let out = plain(&render(&test_run(), &test_history()).unwrap());
        assert!(out.contains("Home Health Report"));
        assert!(out.contains("Score: 86.0/100"));
        assert!(out.contains("GOOD"));
        assert!(out.contains("Issues: 2"));
    }

    #[test]
    fn test_findings_grouped_by_category_title() {
        let out = plain(&render(&test_run(), &test_history()).unwrap());
        let batteries = out.find("BATTERIES (1)").expect("batteries section");
        let mesh = out.find("ZIGBEE MESH (1)").expect("mesh section");
        assert!(batteries < mesh);
        assert!(out.contains("affects: sensor.door_battery"));
    }

    #[test]
    fn test_trend_and_details() {
        let out = plain(&render(&test_run(), &test_history()).unwrap());
        assert!(out.contains("Trend: ▼ -4.0 since 2024-05-01 08:00 UTC (was 90.0)"));
        assert!(out.contains("avg LQI 210.0"));
        assert!(out.contains("avg RSSI -41.0 dBm"));
    }

    #[test]
    fn test_no_trend_without_previous_run() {
        let out = plain(&render(&test_run(), &SnapshotHistory::default()).unwrap());
        assert!(!out.contains("Trend:"));
    }
}
