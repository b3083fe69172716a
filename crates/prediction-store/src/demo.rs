//! Demo dataset: a handful of pending predictions plus some resolved ones so
//! the stats page has something to show.

use chrono::{DateTime, Duration, Utc};
use forecast_core::{ForecastResult, NewPrediction, Prediction};

const DEMO: &[(&str, f64, Option<bool>)] = &[
    ("I will finish reading my current book this week", 0.75, None),
    ("It will rain tomorrow in my city", 0.30, None),
    ("I will exercise at least 3 times this week", 0.65, None),
    ("My favorite team will win their next game", 0.55, None),
    ("I will complete my iOS project by the deadline", 0.85, None),
    ("I will learn a new programming language this month", 0.40, None),
    ("I thought it would be sunny yesterday", 0.70, Some(true)),
    ("I predicted I would wake up before 8am", 0.50, Some(false)),
    ("I thought my package would arrive on time", 0.80, Some(true)),
    ("I predicted I would go to the gym", 0.60, Some(false)),
    ("I thought the meeting would be cancelled", 0.20, Some(false)),
    ("I predicted my friend would call me back", 0.90, Some(true)),
    ("I thought I would finish my homework early", 0.45, Some(true)),
    ("I predicted the restaurant would be crowded", 0.70, Some(true)),
];

/// Build the demo predictions, staggered one minute apart ending at `now`.
pub fn demo_predictions(now: DateTime<Utc>) -> ForecastResult<Vec<Prediction>> {
    let count = DEMO.len() as i64;

    DEMO.iter()
        .enumerate()
        .map(|(i, &(description, probability, outcome))| {
            let created_at = now - Duration::minutes(count - i as i64);
            let mut prediction = Prediction::new(
                NewPrediction {
                    description: description.to_string(),
                    probability,
                    resolve_by: None,
                },
                created_at,
            )?;
            if let Some(outcome) = outcome {
                prediction.resolve(outcome, now)?;
            }
            Ok(prediction)
        })
        .collect()
}
