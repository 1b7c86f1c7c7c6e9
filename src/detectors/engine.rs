//! Detector execution engine with parallel support
//!
//! The DetectorEngine orchestrates the execution of all registered detectors:
//! - Runs detectors in parallel using rayon
//! - Isolates each detector behind `catch_unwind`
//! - Returns one result per detector, in registration order
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    DetectorEngine                       │
//! ├─────────────────────────────────────────────────────────┤
//! │  1. Register detectors                                  │
//! │  2. Skip detectors whose data source is absent          │
//! │  3. Run the rest in parallel (rayon)                    │
//! │  4. Collect results in registration order               │
//! └─────────────────────────────────────────────────────────┘
//! ```

use crate::detectors::base::{DetectionSummary, Detector, DetectorResult};
use crate::telemetry::Snapshot;
use anyhow::Result;
use rayon::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Orchestrates analysis across all registered detectors
pub struct DetectorEngine {
    /// Registered detectors
    detectors: Vec<Arc<dyn Detector>>,
    /// Number of worker threads for parallel execution
    workers: usize,
}

impl DetectorEngine {
    /// Create a new detector engine
    ///
    /// # Arguments
    /// * `workers` - Number of worker threads (0 = auto-detect)
    pub fn new(workers: usize) -> Self {
        let actual_workers = if workers == 0 {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
                .min(8)
        } else {
            workers
        };

        Self {
            detectors: Vec::new(),
            workers: actual_workers,
        }
    }

    /// Register a detector
    pub fn register(&mut self, detector: Arc<dyn Detector>) {
        debug!("Registering detector: {}", detector.name());
        self.detectors.push(detector);
    }

    /// Register multiple detectors at once
    pub fn register_all(&mut self, detectors: impl IntoIterator<Item = Arc<dyn Detector>>) {
        for detector in detectors {
            self.register(detector);
        }
    }

    /// Get the number of registered detectors
    pub fn detector_count(&self) -> usize {
        self.detectors.len()
    }

    /// Get names of all registered detectors
    pub fn detector_names(&self) -> Vec<&'static str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run all detectors over one snapshot.
    ///
    /// Results come back in registration order regardless of which worker
    /// finished first. Only a failure to build the thread pool is an error;
    /// detector failures are reported inside their `DetectorResult`.
    pub fn run(&self, snapshot: &Snapshot) -> Result<Vec<DetectorResult>> {
        let start = Instant::now();
        info!(
            "Starting diagnostics with {} detectors on {} workers",
            self.detectors.len(),
            self.workers
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()?;

        let results: Vec<DetectorResult> = pool.install(|| {
            self.detectors
                .par_iter()
                .map(|detector| Self::run_single_detector(detector, snapshot))
                .collect()
        });

        let mut summary = DetectionSummary::default();
        for result in &results {
            summary.add_result(result);
            if let Some(err) = &result.error {
                warn!("Detector {} failed: {}", result.detector_name, err);
            }
        }

        info!(
            "Diagnostics complete: {} findings from {}/{} detectors ({} skipped, {} failed) in {:?}",
            summary.total_findings,
            summary.detectors_succeeded,
            summary.detectors_run,
            summary.detectors_skipped,
            summary.detectors_failed,
            start.elapsed()
        );

        Ok(results)
    }

    /// Run one detector with panic isolation
    fn run_single_detector(detector: &Arc<dyn Detector>, snapshot: &Snapshot) -> DetectorResult {
        let name = detector.name().to_string();

        if !detector.can_run(snapshot) {
            debug!("Detector {} skipped: no input data", name);
            return DetectorResult::skipped(name);
        }

        let start = Instant::now();
        debug!("Running detector: {}", name);

        let detect_result =
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| detector.detect(snapshot)));
        let duration = start.elapsed().as_millis() as u64;

        match detect_result {
            Ok(Ok(output)) => {
                debug!(
                    "Detector {} found {} findings in {}ms",
                    name,
                    output.findings.len(),
                    duration
                );
                DetectorResult::success(name, output, duration)
            }
            Ok(Err(e)) => DetectorResult::failure(name, e.to_string(), duration),
            Err(panic_info) => {
                let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_info.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };
                error!("Detector {} panicked: {}", name, panic_msg);
                DetectorResult::failure(name, format!("Panic: {}", panic_msg), duration)
            }
        }
    }
}

impl Default for DetectorEngine {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::base::{DetectorOutput, DetectorStatus};
    use crate::models::{Category, Finding, Severity};
    use chrono::Utc;

    enum Behaviour {
        Findings(usize),
        Skip,
        Fail,
        Panic,
    }

    // Mock detector for testing
    struct MockDetector {
        name: &'static str,
        behaviour: Behaviour,
    }

    impl Detector for MockDetector {
        fn name(&self) -> &'static str {
            self.name
        }

        fn description(&self) -> &'static str {
            "Mock detector for testing"
        }

        fn category(&self) -> Category {
            Category::Entities
        }

        fn can_run(&self, _snapshot: &Snapshot) -> bool {
            !matches!(self.behaviour, Behaviour::Skip)
        }

        fn detect(&self, _snapshot: &Snapshot) -> Result<DetectorOutput> {
            match self.behaviour {
                Behaviour::Findings(n) => Ok(DetectorOutput::findings(
                    (0..n)
                        .map(|i| {
                            Finding::new(
                                self.name,
                                Category::Entities,
                                Severity::Medium,
                                format!("Finding {}", i),
                                vec![],
                            )
                        })
                        .collect(),
                )),
                Behaviour::Fail => anyhow::bail!("source unavailable"),
                Behaviour::Panic => panic!("detector exploded"),
                Behaviour::Skip => unreachable!(),
            }
        }
    }

    fn mock(name: &'static str, behaviour: Behaviour) -> Arc<dyn Detector> {
        Arc::new(MockDetector { name, behaviour })
    }

    #[test]
    fn test_engine_creation() {
        let engine = DetectorEngine::new(4);
        assert_eq!(engine.workers(), 4);
        assert_eq!(engine.detector_count(), 0);
    }

    #[test]
    fn test_engine_default_workers() {
        let engine = DetectorEngine::new(0);
        assert!(engine.workers() > 0);
        assert!(engine.workers() <= 8);
    }

    #[test]
    fn test_results_keep_registration_order() {
        let mut engine = DetectorEngine::new(3);
        engine.register_all(vec![
            mock("first", Behaviour::Findings(5)),
            mock("second", Behaviour::Findings(0)),
            mock("third", Behaviour::Findings(2)),
        ]);
        assert_eq!(engine.detector_names(), vec!["first", "second", "third"]);

        let results = engine.run(&Snapshot::empty(Utc::now())).unwrap();
        let names: Vec<_> = results.iter().map(|r| r.detector_name.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
        assert_eq!(results[0].findings.len(), 5);
        assert!(results[1].completed());
    }

    #[test]
    fn test_failures_and_panics_are_isolated() {
        let mut engine = DetectorEngine::new(2);
        engine.register_all(vec![
            mock("ok", Behaviour::Findings(1)),
            mock("errors", Behaviour::Fail),
            mock("panics", Behaviour::Panic),
            mock("skips", Behaviour::Skip),
        ]);

        let results = engine.run(&Snapshot::empty(Utc::now())).unwrap();
        assert_eq!(results[0].status, DetectorStatus::Completed);
        assert_eq!(results[1].status, DetectorStatus::Failed);
        assert_eq!(results[1].error.as_deref(), Some("source unavailable"));
        assert_eq!(results[2].status, DetectorStatus::Failed);
        assert!(results[2].error.as_deref().unwrap().contains("detector exploded"));
        assert_eq!(results[3].status, DetectorStatus::Skipped);
    }
}
