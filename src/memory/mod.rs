// src/memory/mod.rs

use crate::pipeline::TrialRecord;
use serde::Serialize;

/// Append-only sink for trial records. Persisting them (CSV, charts) is
/// left to the caller.
pub trait TrialLog {
    fn append(&mut self, record: &TrialRecord);
    fn records(&self) -> &[TrialRecord];
}

/// In-memory implementation of the TrialLog trait.
#[derive(Default, Debug)]
pub struct InMemoryLog {
    pub entries: Vec<TrialRecord>,
}

impl InMemoryLog {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl TrialLog for InMemoryLog {
    fn append(&mut self, record: &TrialRecord) {
        self.entries.push(record.clone());
    }

    fn records(&self) -> &[TrialRecord] {
        &self.entries
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TrialSummary {
    pub trials: usize,
    pub successes: usize,
    pub fallbacks: usize,
    /// Mean latency in seconds over successful parses.
    pub mean_latency: f64,
    pub mean_retries: f64,
    pub mean_logical_score: f64,
}

impl TrialSummary {
    pub fn from_records(records: &[TrialRecord]) -> Self {
        if records.is_empty() {
            return Self::default();
        }
        let trials = records.len();
        let parsed: Vec<_> = records.iter().filter(|r| r.parse.success).collect();
        let mean_latency = if parsed.is_empty() {
            0.0
        } else {
            parsed.iter().map(|r| r.parse.latency.as_secs_f64()).sum::<f64>() / parsed.len() as f64
        };

        Self {
            trials,
            successes: parsed.len(),
            fallbacks: records.iter().filter(|r| r.parse.fallback_occurred).count(),
            mean_latency,
            mean_retries: records.iter().map(|r| r.parse.retries as f64).sum::<f64>() / trials as f64,
            mean_logical_score: records.iter().map(|r| r.logical_score).sum::<f64>() / trials as f64,
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.trials == 0 {
            0.0
        } else {
            self.successes as f64 / self.trials as f64
        }
    }
}
