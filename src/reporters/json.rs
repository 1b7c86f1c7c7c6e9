//! JSON reporter
//!
//! Outputs the HealthReport fields at the top level plus a `details` object
//! with the analyzer payloads. Useful for dashboards, piping to jq, or
//! further processing.

use crate::pipeline::DiagnosticRun;
use anyhow::Result;

/// Render run as JSON
pub fn render(run: &DiagnosticRun) -> Result<String> {
    Ok(serde_json::to_string_pretty(run)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporters::tests::test_run;

    #[test]
    fn test_json_top_level_fields() {
        let json_str = render(&test_run()).expect("render JSON");
        let parsed: serde_json::Value = serde_json::from_str(&json_str).expect("parse JSON");
        assert_eq!(parsed["overall_score"], 86.0);
        assert_eq!(parsed["overall_label"], "GOOD");
        assert_eq!(parsed["total_issues"], 2);
        assert_eq!(parsed["severity_counts"]["high"], 1);
        assert_eq!(parsed["category_counts"]["logs_errors"], 0);
        assert_eq!(parsed["diagnostics_performed"][1], "mesh_topology");
        assert_eq!(parsed["details"]["mesh"]["lqi_histogram"]["excellent"], 1);
        assert!(parsed["details"]["energy"].is_null());
    }

    #[test]
    fn test_json_finding_order_and_shape() {
        let json_str = render(&test_run()).expect("render JSON");
        let parsed: serde_json::Value = serde_json::from_str(&json_str).expect("parse JSON");
        let findings = parsed["findings"].as_array().expect("findings array");
        assert_eq!(findings[0]["category"], "batteries");
        assert_eq!(findings[1]["category"], "mesh");
        assert_eq!(findings[1]["severity"], "high");
        assert_eq!(findings[1]["id"].as_str().map(str::len), Some(16));
    }

    #[test]
    fn test_json_is_deterministic() {
        assert_eq!(render(&test_run()).unwrap(), render(&test_run()).unwrap());
    }
}
