//! Calibration Engine
//!
//! Scores resolved predictions with the Brier score and bins them into a
//! reliability diagram. Pure, synchronous and side-effect free: the same
//! snapshot of predictions always produces the same `StatsResult`.

pub mod bins;
pub mod engine;

pub use bins::{bin_index, CalibrationBin, BIN_COUNT, MIN_BIN_COUNT};
pub use engine::{brier_score, compute_stats, StatsResult};
