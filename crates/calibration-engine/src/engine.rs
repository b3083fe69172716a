//! Brier score and reliability bins over a snapshot of predictions.

use forecast_core::Prediction;
use serde::{Deserialize, Serialize};

use crate::bins::{bin_index, BinAccumulator, CalibrationBin, BIN_COUNT};

/// Calibration summary for a set of predictions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct StatsResult {
    /// All predictions, whatever their state
    pub total_predictions: usize,
    /// Resolved predictions with a recorded outcome, scored or not
    pub resolved_predictions: usize,
    /// Mean squared error of probability vs outcome (lower is better, 0 is perfect).
    /// `None` when nothing is scoreable yet.
    pub brier_score: Option<f64>,
    /// Buckets with at least `MIN_BIN_COUNT` predictions, by increasing lower bound
    pub calibration_bins: Vec<CalibrationBin>,
}

/// Compute calibration statistics for a snapshot of predictions.
///
/// Only scoreable predictions (resolved with an outcome) contribute to the
/// Brier score and the bins; every record counts towards `total_predictions`.
/// A scoreable record with an invalid probability still counts as resolved
/// but is left out of the score. The input is only read.
pub fn compute_stats<'a, I>(predictions: I) -> StatsResult
where
    I: IntoIterator<Item = &'a Prediction>,
{
    let mut total = 0usize;
    let mut resolved = 0usize;
    let mut scored = Vec::new();
    let mut buckets = [BinAccumulator::default(); BIN_COUNT];

    for prediction in predictions {
        total += 1;

        let outcome = match (prediction.resolved, prediction.outcome) {
            (true, Some(outcome)) => outcome,
            _ => continue,
        };
        resolved += 1;

        let p = prediction.probability;
        if !p.is_finite() || !(0.0..=1.0).contains(&p) {
            tracing::warn!(
                "Skipping prediction {} with out-of-range probability {}",
                prediction.id,
                p
            );
            continue;
        }

        scored.push((p, outcome));
        buckets[bin_index(p)].push(p, outcome);
    }

    let calibration_bins = buckets
        .into_iter()
        .enumerate()
        .filter_map(|(i, bucket)| bucket.finish(i))
        .collect();

    StatsResult {
        total_predictions: total,
        resolved_predictions: resolved,
        brier_score: brier_score(&scored),
        calibration_bins,
    }
}

/// Brier score for `(probability, outcome)` pairs; `None` for an empty slice.
pub fn brier_score(pairs: &[(f64, bool)]) -> Option<f64> {
    if pairs.is_empty() {
        return None;
    }
    let sum: f64 = pairs.iter().map(|&(p, o)| squared_error(p, o)).sum();
    Some(sum / pairs.len() as f64)
}

fn squared_error(probability: f64, outcome: bool) -> f64 {
    let y = if outcome { 1.0 } else { 0.0 };
    (probability - y).powi(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn prediction(probability: f64, outcome: Option<bool>) -> Prediction {
        Prediction {
            id: Uuid::new_v4(),
            description: "Test prediction description".to_string(),
            probability,
            created_at: Utc::now(),
            resolve_by: None,
            resolved: outcome.is_some(),
            outcome,
            resolved_at: outcome.map(|_| Utc::now()),
        }
    }

    fn resolved(probability: f64, outcome: bool) -> Prediction {
        prediction(probability, Some(outcome))
    }

    fn rand_like(seed: u64) -> f64 {
        let x = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (x >> 11) as f64 / (1u64 << 53) as f64
    }

    #[test]
    fn test_empty_input_has_no_score() {
        let stats = compute_stats(&Vec::<Prediction>::new());
        assert_eq!(stats.total_predictions, 0);
        assert_eq!(stats.resolved_predictions, 0);
        assert_eq!(stats.brier_score, None);
        assert!(stats.calibration_bins.is_empty());
    }

    #[test]
    fn test_only_pending_predictions() {
        let predictions = vec![prediction(0.4, None), prediction(0.9, None)];
        let stats = compute_stats(&predictions);

        assert_eq!(stats.total_predictions, 2);
        assert_eq!(stats.resolved_predictions, 0);
        assert_eq!(stats.brier_score, None);
        assert!(stats.calibration_bins.is_empty());
    }

    #[test]
    fn test_resolved_without_outcome_is_not_scoreable() {
        let mut odd = prediction(0.5, None);
        odd.resolved = true;
        let predictions = vec![odd, resolved(0.5, true)];

        let stats = compute_stats(&predictions);
        assert_eq!(stats.total_predictions, 2);
        assert_eq!(stats.resolved_predictions, 1);
        assert_eq!(stats.brier_score, Some(0.25));
    }

    #[test]
    fn test_perfect_and_worst_forecasts() {
        let perfect = vec![resolved(1.0, true), resolved(0.0, false), resolved(1.0, true)];
        assert_eq!(compute_stats(&perfect).brier_score, Some(0.0));

        let worst = vec![resolved(0.0, true), resolved(1.0, false)];
        assert_eq!(compute_stats(&worst).brier_score, Some(1.0));
    }

    #[test]
    fn test_eighty_percent_bucket_scenario() {
        let predictions = vec![
            resolved(0.82, true),
            resolved(0.85, true),
            resolved(0.88, true),
            resolved(0.84, false),
        ];
        let stats = compute_stats(&predictions);

        assert_eq!(stats.resolved_predictions, 4);
        assert_eq!(stats.calibration_bins.len(), 1);

        let bin = &stats.calibration_bins[0];
        assert_eq!(bin.range_label, "80-90%");
        assert_eq!(bin.count, 4);
        assert!((bin.avg_predicted - 0.8475).abs() < 1e-9);
        assert!((bin.actual_frequency - 0.75).abs() < 1e-12);

        let expected = (0.18f64.powi(2) + 0.15f64.powi(2) + 0.12f64.powi(2) + 0.84f64.powi(2)) / 4.0;
        let brier = stats.brier_score.unwrap();
        assert!((brier - expected).abs() < 1e-12);
        assert!((brier - 0.193725).abs() < 1e-9);
    }

    #[test]
    fn test_probability_one_lands_in_top_bucket() {
        let predictions = vec![
            resolved(1.0, true),
            resolved(1.0, true),
            resolved(0.95, false),
        ];
        let stats = compute_stats(&predictions);

        assert_eq!(stats.calibration_bins.len(), 1);
        let bin = &stats.calibration_bins[0];
        assert_eq!(bin.range_label, "90-100%");
        assert_eq!(bin.count, 3);
        assert_eq!(bin.upper, 1.0);
    }

    #[test]
    fn test_boundary_value_opens_next_bucket() {
        let predictions = vec![
            resolved(0.3, true),
            resolved(0.3, false),
            resolved(0.3, false),
        ];
        let stats = compute_stats(&predictions);

        assert_eq!(stats.calibration_bins.len(), 1);
        assert_eq!(stats.calibration_bins[0].range_label, "30-40%");
        assert_eq!(stats.calibration_bins[0].lower, 0.3);
    }

    #[test]
    fn test_small_buckets_are_suppressed_not_zero_filled() {
        let predictions = vec![
            resolved(0.15, true),
            resolved(0.12, false),
            resolved(0.62, true),
            resolved(0.65, true),
            resolved(0.68, false),
        ];
        let stats = compute_stats(&predictions);

        assert_eq!(stats.resolved_predictions, 5);
        assert_eq!(stats.calibration_bins.len(), 1);
        assert_eq!(stats.calibration_bins[0].range_label, "60-70%");

        let binned: usize = stats.calibration_bins.iter().map(|b| b.count).sum();
        assert!(binned < stats.resolved_predictions);
    }

    #[test]
    fn test_bins_are_ordered_by_lower_bound() {
        let mut predictions = Vec::new();
        for &p in &[0.95, 0.15, 0.55] {
            for i in 0..3 {
                predictions.push(resolved(p, i % 2 == 0));
            }
        }
        let stats = compute_stats(&predictions);
        let lowers: Vec<f64> = stats.calibration_bins.iter().map(|b| b.lower).collect();
        assert_eq!(lowers, vec![0.1, 0.5, 0.9]);
    }

    #[test]
    fn test_out_of_range_records_are_not_scored() {
        let predictions = vec![resolved(f64::NAN, true), resolved(1.5, false), resolved(0.5, true)];
        let stats = compute_stats(&predictions);

        assert_eq!(stats.total_predictions, 3);
        assert_eq!(stats.resolved_predictions, 3);
        assert_eq!(stats.brier_score, Some(0.25));
        let binned: usize = stats.calibration_bins.iter().map(|b| b.count).sum();
        assert_eq!(binned, 0);
    }

    #[test]
    fn test_only_invalid_records_have_no_score() {
        let predictions = vec![resolved(-0.5, true), resolved(f64::INFINITY, false)];
        let stats = compute_stats(&predictions);

        assert_eq!(stats.resolved_predictions, 2);
        assert_eq!(stats.brier_score, None);
        assert!(stats.calibration_bins.is_empty());
    }

    #[test]
    fn test_value_just_below_edge_keeps_bin_mean_in_range() {
        let predictions = vec![
            resolved(0.29999999995, true),
            resolved(0.25, false),
            resolved(0.21, false),
            resolved(0.3, true),
        ];
        let stats = compute_stats(&predictions);

        assert_eq!(stats.calibration_bins.len(), 1);
        let bin = &stats.calibration_bins[0];
        assert_eq!(bin.range_label, "20-30%");
        assert_eq!(bin.count, 3);
        assert!(bin.avg_predicted < bin.upper);
    }

    #[test]
    fn test_randomized_invariants() {
        for round in 0..50u64 {
            let predictions: Vec<Prediction> = (0..(round * 7 % 60))
                .map(|i| {
                    let seed = round * 1000 + i;
                    let p = (rand_like(seed) * 100.0).round() / 100.0;
                    match rand_like(seed + 17) {
                        r if r < 0.2 => prediction(p, None),
                        r => resolved(p, r > 0.6),
                    }
                })
                .collect();

            let first = compute_stats(&predictions);
            let second = compute_stats(&predictions);
            assert_eq!(first, second);

            assert!(first.resolved_predictions <= first.total_predictions);
            let binned: usize = first.calibration_bins.iter().map(|b| b.count).sum();
            assert!(binned <= first.resolved_predictions);

            if let Some(score) = first.brier_score {
                assert!((0.0..=1.0).contains(&score));
            } else {
                assert_eq!(first.resolved_predictions, 0);
            }

            for p in predictions.iter().filter(|p| p.is_scoreable()) {
                let k = bin_index(p.probability);
                let lower = k as f64 / BIN_COUNT as f64;
                let upper = (k + 1) as f64 / BIN_COUNT as f64;
                assert!(p.probability >= lower);
                assert!(p.probability < upper || (k == BIN_COUNT - 1 && p.probability == 1.0));
            }

            // The mean may sit a few ulps outside its bucket from summation rounding alone
            for bin in &first.calibration_bins {
                assert!(bin.count >= crate::MIN_BIN_COUNT);
                assert!(bin.avg_predicted >= bin.lower - 1e-12);
                assert!(bin.avg_predicted <= bin.upper + 1e-12);
                assert!((0.0..=1.0).contains(&bin.actual_frequency));
            }
        }
    }

    #[test]
    fn test_input_is_left_untouched() {
        let predictions = vec![resolved(0.7, true), prediction(0.2, None)];
        let before = predictions.clone();
        let _ = compute_stats(&predictions);
        assert_eq!(predictions, before);
    }

    #[test]
    fn test_brier_score_pairs() {
        assert_eq!(brier_score(&[]), None);
        assert_eq!(brier_score(&[(0.5, true), (0.5, false)]), Some(0.25));
    }

    #[test]
    fn test_stats_serialize_null_score() {
        let json = serde_json::to_value(compute_stats(&Vec::<Prediction>::new())).unwrap();
        assert!(json["brier_score"].is_null());
        assert_eq!(json["calibration_bins"], serde_json::json!([]));
    }
}
