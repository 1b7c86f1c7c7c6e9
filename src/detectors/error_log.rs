//! Error log summary
//!
//! Parses log lines of the form
//! `2024-05-01 10:00:00.123 ERROR (MainThread) [logger.name] message`
//! and counts errors and warnings per logger. Lines that do not match
//! (tracebacks, continuation lines) are ignored.

use crate::config::LogConfig;
use crate::detectors::base::{Detector, DetectorOutput};
use crate::models::{Category, Finding, Severity};
use crate::telemetry::Snapshot;
use anyhow::Result;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

const DETECTOR_NAME: &str = "error_log";

/// Loggers named in the error finding
const NOISIEST_LOGGERS: usize = 3;

static LOG_LINE: OnceLock<Regex> = OnceLock::new();

fn log_line() -> &'static Regex {
    LOG_LINE.get_or_init(|| {
        Regex::new(
            r"^\d{4}-\d{2}-\d{2}[ T]\d{2}:\d{2}:\d{2}(?:\.\d+)?\s+([A-Z]+)\s+\([^)]*\)\s+\[([^\]]+)\]",
        )
        .expect("log line regex is valid")
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogLevel {
    Error,
    Warning,
    Other,
}

fn parse_line(line: &str) -> Option<(LogLevel, &str)> {
    let caps = log_line().captures(line)?;
    let level = match caps.get(1)?.as_str() {
        "ERROR" | "CRITICAL" | "FATAL" => LogLevel::Error,
        "WARNING" | "WARN" => LogLevel::Warning,
        _ => LogLevel::Other,
    };
    Some((level, caps.get(2)?.as_str()))
}

/// Summarizes errors and warnings from the system log
pub struct ErrorLogDetector {
    config: LogConfig,
}

impl ErrorLogDetector {
    pub fn new(config: LogConfig) -> Self {
        Self { config }
    }
}

impl Default for ErrorLogDetector {
    fn default() -> Self {
        Self::new(LogConfig::default())
    }
}

impl Detector for ErrorLogDetector {
    fn name(&self) -> &'static str {
        DETECTOR_NAME
    }

    fn description(&self) -> &'static str {
        "Counts errors and warnings in the system log"
    }

    fn category(&self) -> Category {
        Category::LogsErrors
    }

    fn can_run(&self, snapshot: &Snapshot) -> bool {
        snapshot.error_log.is_some()
    }

    fn detect(&self, snapshot: &Snapshot) -> Result<DetectorOutput> {
        let lines = snapshot.error_log.as_deref().unwrap_or_default();

        let mut errors_by_logger: BTreeMap<&str, usize> = BTreeMap::new();
        let mut warnings = 0;
        for line in lines {
            match parse_line(line) {
                Some((LogLevel::Error, logger)) => *errors_by_logger.entry(logger).or_insert(0) += 1,
                Some((LogLevel::Warning, _)) => warnings += 1,
                _ => {}
            }
        }
        let errors: usize = errors_by_logger.values().sum();

        let mut findings = Vec::new();
        if errors > 0 {
            let mut noisiest: Vec<(&str, usize)> = errors_by_logger.into_iter().collect();
            noisiest.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
            noisiest.truncate(NOISIEST_LOGGERS);

            let severity = if errors >= self.config.error_high_threshold {
                Severity::High
            } else {
                Severity::Medium
            };
            let listed: Vec<String> = noisiest.iter().map(|(l, n)| format!("{} ({})", l, n)).collect();
            findings.push(Finding::new(
                DETECTOR_NAME,
                Category::LogsErrors,
                severity,
                format!("{} errors in the system log; noisiest: {}", errors, listed.join(", ")),
                vec![],
            ));
        }
        if warnings > self.config.warning_threshold {
            findings.push(Finding::new(
                DETECTOR_NAME,
                Category::LogsErrors,
                Severity::Low,
                format!("{} warnings in the system log", warnings),
                vec![],
            ));
        }
        Ok(DetectorOutput::findings(findings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn snapshot(lines: &[&str]) -> Snapshot {
        let mut s = Snapshot::empty(Utc::now());
        s.error_log = Some(lines.iter().map(|l| l.to_string()).collect());
        s
    }

    #[test]
    fn test_parse_line() {
        assert_eq!(
            parse_line("2024-05-01 10:00:00.123 ERROR (MainThread) [homeassistant.components.zha] Timeout"),
            Some((LogLevel::Error, "homeassistant.components.zha"))
        );
        assert_eq!(
            parse_line("2024-05-01 10:00:00 WARNING (SyncWorker_3) [custom_components.hacs] slow"),
            Some((LogLevel::Warning, "custom_components.hacs"))
        );
        assert_eq!(parse_line("Traceback (most recent call last):"), None);
    }

    #[test]
    fn test_errors_name_noisiest_loggers() {
        let output = ErrorLogDetector::default()
            .detect(&snapshot(&[
                "2024-05-01 10:00:00 ERROR (MainThread) [zha] a",
                "2024-05-01 10:00:01 ERROR (MainThread) [zha] b",
                "2024-05-01 10:00:02 CRITICAL (MainThread) [recorder] c",
                "2024-05-01 10:00:03 INFO (MainThread) [core] d",
            ]))
            .unwrap();
        assert_eq!(output.findings.len(), 1);
        assert_eq!(output.findings[0].severity(), Severity::Medium);
        assert!(output.findings[0].description().contains("3 errors"));
        assert!(output.findings[0].description().ends_with("zha (2), recorder (1)"));
    }

    #[test]
    fn test_warning_threshold() {
        let detector = ErrorLogDetector::new(LogConfig {
            warning_threshold: 1,
            ..LogConfig::default()
        });
        let output = detector
            .detect(&snapshot(&[
                "2024-05-01 10:00:00 WARNING (MainThread) [a] x",
                "2024-05-01 10:00:00 WARNING (MainThread) [b] y",
            ]))
            .unwrap();
        assert_eq!(output.findings.len(), 1);
        assert_eq!(output.findings[0].severity(), Severity::Low);
    }

    #[test]
    fn test_clean_log_and_missing_log() {
        let detector = ErrorLogDetector::default();
        assert!(detector.detect(&snapshot(&[])).unwrap().findings.is_empty());
        assert!(!detector.can_run(&Snapshot::empty(Utc::now())));
    }
}
