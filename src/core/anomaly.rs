//! Anomaly scoring on top of the Spatial Pooler and Temporal Memory.
//!
//! The `AnomalyScorer` owns one pooler and one memory and drives them once per observation.
//! The score of an observation is the fraction of its active cells that the memory did not
//! predict. Recent scores are kept in a fixed-capacity window from which the rolling average
//! and anomaly rate are derived.

use super::{spatial_pooler::SpatialPooler, temporal_memory::TemporalMemory};
use crate::error::{HtmError, Result};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, trace};

/// Construction parameters of an `AnomalyScorer`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyScorerParams {
    /// Number of recent scores kept for the rolling statistics.
    pub history_window: usize,
    /// Scores at or above this value are anomalous. Clamped to `[0, 1]`.
    pub anomaly_threshold: f64,
}

impl Default for AnomalyScorerParams {
    fn default() -> Self {
        Self {
            history_window: 100,
            anomaly_threshold: 0.7,
        }
    }
}

/// Snapshot of the scorer's counters, intended for external reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Observations processed since construction or the last reset.
    pub throughput: u64,
    /// Always 0.0, memory accounting is not implemented.
    pub memory_usage_mb: f64,
    pub average_anomaly: f64,
    /// Percentage of anomalous scores in the window.
    pub anomaly_rate: f64,
    pub history_size: usize,
}

/// Orchestrates Spatial Pooler → Temporal Memory per observation and tracks rolling statistics.
#[derive(Debug)]
pub struct AnomalyScorer {
    spatial_pooler: SpatialPooler,
    temporal_memory: TemporalMemory,
    history_window: usize,
    anomaly_threshold: f64,
    /// Most recent scores, oldest at the front.
    anomaly_scores: VecDeque<f64>,
    throughput_counter: u64,
}

impl AnomalyScorer {
    /// Creates a scorer over the given pooler and memory.
    ///
    /// Fails if the two disagree on the number of columns or if the window is empty.
    pub fn new(
        spatial_pooler: SpatialPooler,
        temporal_memory: TemporalMemory,
        params: AnomalyScorerParams,
    ) -> Result<Self> {
        if spatial_pooler.num_columns != temporal_memory.column_count() {
            return Err(HtmError::ColumnMismatch {
                pooler: spatial_pooler.num_columns,
                memory: temporal_memory.column_count(),
            });
        }
        if params.history_window == 0 {
            return Err(HtmError::invalid("history_window", "must be greater than zero"));
        }

        debug!(
            history_window = params.history_window,
            threshold = params.anomaly_threshold,
            "anomaly scorer initialized"
        );

        Ok(Self {
            spatial_pooler,
            temporal_memory,
            history_window: params.history_window,
            anomaly_threshold: params.anomaly_threshold.clamp(0.0, 1.0),
            anomaly_scores: VecDeque::with_capacity(params.history_window),
            throughput_counter: 0,
        })
    }

    /// Scores one observation:
    /// - Computes the active columns with the Spatial Pooler.
    /// - Feeds them to the Temporal Memory.
    /// - Reads the memory's anomaly score and records it in the window, evicting the oldest score
    ///   once the window is full.
    ///
    /// # Panics
    ///
    /// If `input_vector` does not have the pooler's input width.
    pub fn compute_anomaly(&mut self, input_vector: &[bool], learn: bool) -> f64 {
        let active_columns = self.spatial_pooler.compute(input_vector, learn);
        self.temporal_memory.compute(active_columns, learn);
        let score = self.temporal_memory.anomaly_score();

        if self.anomaly_scores.len() == self.history_window {
            self.anomaly_scores.pop_front();
        }
        self.anomaly_scores.push_back(score);
        self.throughput_counter += 1;

        trace!(step = self.throughput_counter, score, "anomaly score");

        score
    }

    /// Whether `score` reaches the anomaly threshold.
    pub fn is_anomalous(&self, score: f64) -> bool {
        score >= self.anomaly_threshold
    }

    /// Mean of the scores in the window, 0.0 if it is empty.
    pub fn average_anomaly(&self) -> f64 {
        if self.anomaly_scores.is_empty() {
            return 0.0;
        }
        self.anomaly_scores.iter().sum::<f64>() / self.anomaly_scores.len() as f64
    }

    /// Percentage (0-100) of scores in the window that are anomalous, 0.0 if it is empty.
    pub fn anomaly_rate(&self) -> f64 {
        if self.anomaly_scores.is_empty() {
            return 0.0;
        }
        let anomalous = self
            .anomaly_scores
            .iter()
            .filter(|&&score| self.is_anomalous(score))
            .count();
        anomalous as f64 / self.anomaly_scores.len() as f64 * 100.0
    }

    pub fn metrics(&self) -> Metrics {
        Metrics {
            throughput: self.throughput_counter,
            memory_usage_mb: 0.0,
            average_anomaly: self.average_anomaly(),
            anomaly_rate: self.anomaly_rate(),
            history_size: self.anomaly_scores.len(),
        }
    }

    /// Sets the anomaly threshold, clamped to `[0, 1]`.
    pub fn set_threshold(&mut self, threshold: f64) {
        self.anomaly_threshold = threshold.clamp(0.0, 1.0);
    }

    pub fn threshold(&self) -> f64 {
        self.anomaly_threshold
    }

    pub fn history_window(&self) -> usize {
        self.history_window
    }

    /// The recorded scores, oldest first.
    pub fn scores(&self) -> impl ExactSizeIterator<Item = f64> + '_ {
        self.anomaly_scores.iter().copied()
    }

    /// Resets the pooler (new permanences) and the memory (cell state only), clears the window
    /// and the throughput counter.
    pub fn reset(&mut self) {
        self.spatial_pooler.reset();
        self.temporal_memory.reset();
        self.anomaly_scores.clear();
        self.throughput_counter = 0;
        debug!("anomaly scorer reset");
    }

    pub fn spatial_pooler(&self) -> &SpatialPooler {
        &self.spatial_pooler
    }

    pub fn temporal_memory(&self) -> &TemporalMemory {
        &self.temporal_memory
    }
}
