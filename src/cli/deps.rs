//! Deps command - show what references an entity

use anyhow::{Context, Result};
use console::style;
use std::path::Path;

use crate::detectors::{entity_dependencies, EntityDependencies};
use crate::telemetry::{load_snapshot, Snapshot};

/// Run the deps command
pub fn run(snapshot_path: &Path, entities: &[String], json: bool) -> Result<()> {
    let snapshot = load_snapshot(snapshot_path)
        .with_context(|| format!("Failed to load snapshot {}", snapshot_path.display()))?;

    let deps = collect(&snapshot, entities);
    let output = if json {
        serde_json::to_string_pretty(&deps)?
    } else {
        render_text(&deps)
    };
    println!("{}", output);
    Ok(())
}

/// Named entities in the given order, or every entity sorted by id
fn collect(snapshot: &Snapshot, entities: &[String]) -> Vec<EntityDependencies> {
    if entities.is_empty() {
        let mut ids: Vec<&str> = snapshot.entities.iter().map(|e| e.entity_id.as_str()).collect();
        ids.sort_unstable();
        ids.into_iter().map(|id| entity_dependencies(snapshot, id)).collect()
    } else {
        entities.iter().map(|id| entity_dependencies(snapshot, id)).collect()
    }
}

fn render_text(deps: &[EntityDependencies]) -> String {
    let mut out = String::new();
    for dep in deps {
        let header = if dep.known {
            format!("{} ({} references)", style(&dep.entity_id).bold(), dep.total())
        } else {
            format!("{} {}", style(&dep.entity_id).bold(), style("(not in snapshot)").yellow())
        };
        out.push_str(&header);
        out.push('\n');

        if dep.total() == 0 {
            out.push_str(&format!("  {}\n", style("unreferenced").dim()));
            continue;
        }
        for (label, ids) in [
            ("automations", &dep.automations),
            ("scripts", &dep.scripts),
            ("dashboards", &dep.dashboards),
        ] {
            if !ids.is_empty() {
                out.push_str(&format!("  {}: {}\n", label, ids.join(", ")));
            }
        }
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dep(id: &str, automations: &[&str], known: bool) -> EntityDependencies {
        EntityDependencies {
            entity_id: id.to_string(),
            known,
            automations: automations.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_render_text() {
        let out = console::strip_ansi_codes(&render_text(&[
            dep("light.hall", &["automation.a", "automation.b"], true),
            dep("sensor.unused", &[], true),
            dep("sensor.ghost", &[], false),
        ]))
        .to_string();
        assert!(out.contains("light.hall (2 references)\n  automations: automation.a, automation.b"));
        assert!(out.contains("sensor.unused (0 references)\n  unreferenced"));
        assert!(out.contains("sensor.ghost (not in snapshot)"));
        assert!(!out.contains("scripts:"));
    }
}
