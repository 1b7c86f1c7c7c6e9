//! Bounded history of past diagnostic runs
//!
//! The store is an ordinary value owned by its caller; there is no process
//! wide instance. When full, the oldest entry is evicted first.

use crate::models::{HealthLabel, HealthReport};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;

/// Summary of one recorded run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub captured_at: DateTime<Utc>,
    pub overall_score: f64,
    pub overall_label: HealthLabel,
    pub total_issues: usize,
}

impl HistoryEntry {
    pub fn from_report(captured_at: DateTime<Utc>, report: &HealthReport) -> Self {
        Self {
            captured_at,
            overall_score: report.overall_score,
            overall_label: report.overall_label,
            total_issues: report.total_issues,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SnapshotHistory {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl SnapshotHistory {
    /// A capacity of zero is treated as one
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an entry, evicting the oldest when full
    pub fn record(&mut self, entry: HistoryEntry) {
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    /// The entry before the latest
    pub fn previous(&self) -> Option<&HistoryEntry> {
        self.entries.len().checked_sub(2).and_then(|i| self.entries.get(i))
    }

    /// Latest score minus previous score
    pub fn score_delta(&self) -> Option<f64> {
        let latest = self.latest()?;
        let previous = self.previous()?;
        Some(((latest.overall_score - previous.overall_score) * 10.0).round() / 10.0)
    }

    /// Oldest first
    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for SnapshotHistory {
    fn default() -> Self {
        Self::new(10)
    }
}
