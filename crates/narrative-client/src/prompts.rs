//! Prompt templates and response parsing.
//!
//! All prompts ask for plain text (no markdown) since the output is shown
//! verbatim next to the statistics.

use calibration_engine::StatsResult;
use forecast_core::Prediction;
use serde::{Deserialize, Serialize};

use crate::error::{NarrativeError, NarrativeResult};

/// Number of past descriptions included as context for suggestions.
pub const SUGGESTION_CONTEXT_LIMIT: usize = 10;
const SUGGESTION_COUNT: usize = 3;

/// A suggested prediction for the user to make
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub description: String,
    /// Suggested starting confidence, in percent
    pub confidence: f64,
}

pub fn calibration_summary_prompt(stats: &StatsResult) -> String {
    let brier = match stats.brier_score {
        Some(score) => format!("{:.4} (lower is better, 0 = perfect, 0.25 = random)", score),
        None => "not available yet (no resolved predictions)".to_string(),
    };

    let calibration_data = if stats.calibration_bins.is_empty() {
        "Not enough data yet (need at least 3 predictions per bin)".to_string()
    } else {
        stats
            .calibration_bins
            .iter()
            .map(|bin| {
                format!(
                    "{}: Predicted {:.1}%, Actually {:.1}% ({} predictions)",
                    bin.range_label,
                    bin.avg_predicted * 100.0,
                    bin.actual_frequency * 100.0,
                    bin.count
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"You are analyzing prediction calibration for someone tracking their forecasting accuracy.

DATA:
- Total predictions: {total}
- Resolved predictions: {resolved}
- Brier Score: {brier}

CALIBRATION BY CONFIDENCE LEVEL:
{calibration_data}

TASK: Write a brief, friendly 3-4 sentence analysis in plain text (no markdown, no asterisks, no formatting).

Focus on:
1. What the Brier score means for their accuracy
2. Which confidence ranges show good/poor calibration
3. One specific actionable tip to improve

Keep it conversational and encouraging. Use simple percentages and comparisons."#,
        total = stats.total_predictions,
        resolved = stats.resolved_predictions,
    )
}

pub fn prediction_insight_prompt(prediction: &Prediction) -> String {
    let prob = prediction.probability * 100.0;

    match prediction.outcome.filter(|_| prediction.resolved) {
        Some(outcome) => {
            let happened = if outcome { "happened" } else { "did not happen" };
            format!(
                r#"Quick analysis of this prediction:

Prediction: "{description}"
Your confidence: {prob:.0}%
What actually happened: It {happened}

Write 2-3 short sentences in plain text (no markdown) analyzing:
1. Was your {prob:.0}% confidence appropriate?
2. One specific insight about this prediction

Be conversational and helpful."#,
                description = prediction.description,
            )
        }
        None => format!(
            r#"This prediction is still pending:

"{description}"
Predicted at {prob:.0}% confidence

Write 1-2 short sentences in plain text (no markdown) about:
- Whether the confidence level seems reasonable
- What to watch for when it resolves

Be brief and conversational."#,
            description = prediction.description,
        ),
    }
}

pub fn suggestions_prompt(past_predictions: &[String]) -> String {
    let past_context = if past_predictions.is_empty() {
        String::new()
    } else {
        let past_list = past_predictions
            .iter()
            .take(SUGGESTION_CONTEXT_LIMIT)
            .map(|p| format!("- {}", p))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "\n\nUser's past predictions:\n{}\n\nAvoid repeating these topics and try to match their style.",
            past_list
        )
    };

    format!(
        r#"You are helping someone track predictions to improve their calibration. Generate 3 interesting, specific predictions they should make.

Requirements for good predictions:
- Specific and measurable (clear yes/no outcome)
- Appropriate difficulty level (not too obvious, not impossible to know)
- Time-bound (resolvable within days/weeks/months)
- Relevant to a person's daily life, current events, or personal goals
- Diverse topics (don't repeat similar themes){past_context}

Generate exactly 3 predictions. For each, provide:
1. The prediction statement (1-2 sentences, specific and measurable)
2. A suggested starting confidence level (as a percentage between 30-80%)

Format your response as a JSON array like this:
[
  {{"description": "prediction text here", "confidence": 65}},
  {{"description": "another prediction", "confidence": 50}},
  {{"description": "third prediction", "confidence": 70}}
]

IMPORTANT: Return ONLY the JSON array, no other text or formatting."#
    )
}

/// Parse the model's JSON array of suggestions, tolerating a markdown code
/// fence around it. At most three suggestions are returned.
pub fn parse_suggestions(text: &str) -> NarrativeResult<Vec<Suggestion>> {
    let mut body = text.trim();

    if let Some(fenced) = body.strip_prefix("```") {
        let inner = fenced.split("```").next().unwrap_or_default();
        body = inner.strip_prefix("json").unwrap_or(inner).trim();
    }

    let mut suggestions: Vec<Suggestion> = serde_json::from_str(body)?;
    if suggestions.is_empty() {
        return Err(NarrativeError::InvalidResponse(
            "model returned no suggestions".to_string(),
        ));
    }
    suggestions.truncate(SUGGESTION_COUNT);
    Ok(suggestions)
}

/// Used whenever the provider cannot produce suggestions.
pub fn fallback_suggestions() -> Vec<Suggestion> {
    vec![
        Suggestion {
            description: "It will rain in my city this week".to_string(),
            confidence: 50.0,
        },
        Suggestion {
            description: "I will complete my main work project by the end of this month"
                .to_string(),
            confidence: 70.0,
        },
        Suggestion {
            description: "A major tech company will announce a new product in the next 30 days"
                .to_string(),
            confidence: 60.0,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use calibration_engine::compute_stats;
    use chrono::Utc;
    use forecast_core::NewPrediction;

    fn prediction(probability: f64) -> Prediction {
        Prediction::new(
            NewPrediction {
                description: "My team will win the final".to_string(),
                probability,
                resolve_by: None,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_summary_prompt_without_data() {
        let stats = compute_stats(&Vec::<Prediction>::new());
        let prompt = calibration_summary_prompt(&stats);
        assert!(prompt.contains("Total predictions: 0"));
        assert!(prompt.contains("not available yet"));
        assert!(prompt.contains("Not enough data yet"));
    }

    #[test]
    fn test_summary_prompt_lists_bins_in_percent() {
        let mut predictions = Vec::new();
        for (p, o) in [(0.82, true), (0.85, true), (0.88, true), (0.84, false)] {
            let mut pred = prediction(p);
            pred.resolve(o, Utc::now()).unwrap();
            predictions.push(pred);
        }
        let prompt = calibration_summary_prompt(&compute_stats(&predictions));

        assert!(prompt.contains("80-90%: Predicted 84."));
        assert!(prompt.contains("Actually 75.0% (4 predictions)"));
        assert!(prompt.contains("Brier Score: 0.1937"));
    }

    #[test]
    fn test_insight_prompt_depends_on_state() {
        let mut pred = prediction(0.7);
        assert!(prediction_insight_prompt(&pred).contains("still pending"));

        pred.resolve(false, Utc::now()).unwrap();
        let prompt = prediction_insight_prompt(&pred);
        assert!(prompt.contains("It did not happen"));
        assert!(prompt.contains("Your confidence: 70%"));
    }

    #[test]
    fn test_suggestions_prompt_caps_context() {
        let past: Vec<String> = (0..15).map(|i| format!("past prediction {}", i)).collect();
        let prompt = suggestions_prompt(&past);
        assert!(prompt.contains("- past prediction 9"));
        assert!(!prompt.contains("- past prediction 10"));
        assert!(!suggestions_prompt(&[]).contains("User's past predictions"));
    }

    #[test]
    fn test_parse_plain_json() {
        let text = r#"[{"description": "a", "confidence": 65}, {"description": "b", "confidence": 50}]"#;
        let parsed = parse_suggestions(text).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].confidence, 65.0);
    }

    #[test]
    fn test_parse_fenced_json_and_truncate() {
        let text = "```json\n[\n{\"description\": \"a\", \"confidence\": 40},\n{\"description\": \"b\", \"confidence\": 50},\n{\"description\": \"c\", \"confidence\": 60},\n{\"description\": \"d\", \"confidence\": 70}\n]\n```";
        let parsed = parse_suggestions(text).unwrap();
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[2].description, "c");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_suggestions("Sure! Here are some ideas").is_err());
        assert!(parse_suggestions("[]").is_err());
    }

    #[test]
    fn test_fallback_has_three() {
        assert_eq!(fallback_suggestions().len(), 3);
    }
}
