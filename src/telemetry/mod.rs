//! Telemetry ingestion
//!
//! Raw snapshots arrive as JSON in several shapes; `normalize` maps them
//! onto the canonical records every analyzer consumes.

mod normalize;
mod records;

pub use normalize::{collect_entity_references, normalize_snapshot, parse_timestamp};
pub use records::*;

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while reading raw telemetry
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("telemetry is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("telemetry root must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("failed to read telemetry from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Parse and normalize a snapshot from JSON text
pub fn parse_snapshot(text: &str) -> Result<Snapshot, TelemetryError> {
    let raw: serde_json::Value = serde_json::from_str(text)?;
    normalize_snapshot(&raw)
}

/// Read, parse and normalize a snapshot file
pub fn load_snapshot(path: &Path) -> Result<Snapshot, TelemetryError> {
    let text = std::fs::read_to_string(path).map_err(|source| TelemetryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_snapshot(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rejects_invalid_json() {
        assert!(matches!(parse_snapshot("{not json"), Err(TelemetryError::Parse(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_snapshot(Path::new("/nonexistent/snapshot.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/snapshot.json"));
    }

    #[test]
    fn test_parse_minimal_snapshot() {
        let snapshot = parse_snapshot(r#"{"entities": [{"entity_id": "light.a", "state": "on"}]}"#).unwrap();
        assert_eq!(snapshot.entities.len(), 1);
        assert_eq!(snapshot.captured_at, chrono::DateTime::<chrono::Utc>::default());
    }
}
