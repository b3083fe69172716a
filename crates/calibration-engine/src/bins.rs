//! Reliability diagram buckets.

use serde::{Deserialize, Serialize};

/// Number of equal-width probability buckets covering [0, 1].
pub const BIN_COUNT: usize = 10;

/// Buckets with fewer scoreable predictions than this are suppressed.
pub const MIN_BIN_COUNT: usize = 3;

/// A bucket in the reliability diagram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CalibrationBin {
    /// Human-readable range, e.g. "80-90%"
    pub range_label: String,
    /// Inclusive lower bound
    pub lower: f64,
    /// Exclusive upper bound (inclusive for the last bucket)
    pub upper: f64,
    /// Number of scoreable predictions in this bucket
    pub count: usize,
    /// Mean predicted probability in this bucket
    pub avg_predicted: f64,
    /// Fraction of predictions in this bucket whose outcome was true
    pub actual_frequency: f64,
}

/// Bucket index for a probability in [0, 1].
///
/// Buckets are `[k/10, (k+1)/10)` except the last, which is closed at 1.0.
/// Edges are compared exactly: `k as f64 / 10.0` is the same double as the
/// decimal literal, so `0.3` opens `30-40%` while anything below it stays in
/// `20-30%`.
pub fn bin_index(probability: f64) -> usize {
    (1..BIN_COUNT)
        .filter(|&k| probability >= lower_edge(k))
        .count()
}

fn lower_edge(index: usize) -> f64 {
    index as f64 / BIN_COUNT as f64
}

/// Running totals for one bucket.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct BinAccumulator {
    count: usize,
    sum_predicted: f64,
    positives: usize,
}

impl BinAccumulator {
    pub(crate) fn push(&mut self, probability: f64, outcome: bool) {
        self.count += 1;
        self.sum_predicted += probability;
        if outcome {
            self.positives += 1;
        }
    }

    /// Finish the bucket, or `None` when it has too few samples to report.
    pub(crate) fn finish(self, index: usize) -> Option<CalibrationBin> {
        if self.count < MIN_BIN_COUNT {
            return None;
        }

        let n = self.count as f64;
        Some(CalibrationBin {
            range_label: range_label(index),
            lower: lower_edge(index),
            upper: lower_edge(index + 1),
            count: self.count,
            avg_predicted: self.sum_predicted / n,
            actual_frequency: self.positives as f64 / n,
        })
    }
}

fn range_label(index: usize) -> String {
    let width = 100 / BIN_COUNT;
    format!("{}-{}%", index * width, (index + 1) * width)
}
