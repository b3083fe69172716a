use async_trait::async_trait;
use calibration_engine::StatsResult;
use forecast_core::Prediction;

use crate::error::NarrativeResult;
use crate::prompts::{self, Suggestion};

/// Backend-agnostic interface for natural-language narratives.
///
/// Implementations only need `generate`; the domain calls build their
/// prompts on top of it. Output is free text with no determinism guarantee.
#[async_trait]
pub trait NarrativeProvider: Send + Sync {
    /// Send a raw prompt and return the generated text
    async fn generate(&self, prompt: &str) -> NarrativeResult<String>;

    /// Friendly summary of overall calibration
    async fn calibration_summary(&self, stats: &StatsResult) -> NarrativeResult<String> {
        let text = self
            .generate(&prompts::calibration_summary_prompt(stats))
            .await?;
        Ok(text.trim().to_string())
    }

    /// Short comment on a single prediction, pending or resolved
    async fn prediction_insight(&self, prediction: &Prediction) -> NarrativeResult<String> {
        let text = self
            .generate(&prompts::prediction_insight_prompt(prediction))
            .await?;
        Ok(text.trim().to_string())
    }

    /// Three new predictions the user could make
    async fn suggest_predictions(
        &self,
        past_predictions: &[String],
    ) -> NarrativeResult<Vec<Suggestion>> {
        let text = self
            .generate(&prompts::suggestions_prompt(past_predictions))
            .await?;
        prompts::parse_suggestions(&text)
    }

    fn backend_name(&self) -> &'static str;
}
