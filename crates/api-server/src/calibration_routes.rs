//! Calibration API Routes
//!
//! Statistics over resolved predictions, plus the AI-backed narratives built
//! on top of them. Narratives are best effort: the numbers never depend on
//! the text-generation service.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use calibration_engine::{compute_stats, CalibrationBin, StatsResult};
use forecast_core::PredictionFilter;
use narrative_client::{
    fallback_suggestions, NarrativeError, NarrativeResult, Suggestion, SUGGESTION_CONTEXT_LIMIT,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ApiResponse, AppError, AppState, OptionalApiJson};

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StatsQuery {
    /// Ask the narrative provider for a plain-language summary
    #[serde(default)]
    pub ai_summary: bool,
}

/// One calibration bucket, rounded for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct BinView {
    pub range_label: String,
    pub count: usize,
    pub avg_predicted: f64,
    pub actual_frequency: f64,
}

/// Calibration statistics as shown to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct StatsResponse {
    pub total_predictions: usize,
    pub resolved_predictions: usize,
    pub brier_score: Option<f64>,
    pub calibration_bins: Vec<BinView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_summary: Option<String>,
    /// Set instead of `ai_summary` when a requested summary could not be produced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_summary_error: Option<String>,
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

impl From<&CalibrationBin> for BinView {
    fn from(bin: &CalibrationBin) -> Self {
        Self {
            range_label: bin.range_label.clone(),
            count: bin.count,
            avg_predicted: round3(bin.avg_predicted),
            actual_frequency: round3(bin.actual_frequency),
        }
    }
}

impl From<&StatsResult> for StatsResponse {
    fn from(stats: &StatsResult) -> Self {
        Self {
            total_predictions: stats.total_predictions,
            resolved_predictions: stats.resolved_predictions,
            brier_score: stats.brier_score.map(round3),
            calibration_bins: stats.calibration_bins.iter().map(BinView::from).collect(),
            ai_summary: None,
            ai_summary_error: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct InsightResponse {
    pub prediction_id: Uuid,
    pub insight: String,
}

#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
pub struct SuggestionsRequest {
    /// Descriptions to steer away from; defaults to the most recent predictions
    #[serde(default)]
    pub past_predictions: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SuggestionView {
    pub description: String,
    /// Suggested starting confidence, in percent
    pub confidence: f64,
}

impl From<Suggestion> for SuggestionView {
    fn from(s: Suggestion) -> Self {
        Self {
            description: s.description,
            confidence: s.confidence,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<SuggestionView>,
    /// `ai` or `fallback`
    pub source: String,
}

pub fn calibration_routes() -> Router<AppState> {
    Router::new()
        .route("/api/predictions/stats", get(get_stats))
        .route("/api/predictions/suggestions", post(get_suggestions))
        .route("/api/predictions/:id/insight", get(get_insight))
}

fn summary_placeholder(err: &NarrativeError) -> String {
    match err {
        NarrativeError::NotConfigured => "AI summary is not configured".to_string(),
        NarrativeError::Timeout => "AI summary timed out".to_string(),
        _ => "AI summary is temporarily unavailable".to_string(),
    }
}

async fn summarize(state: &AppState, stats: &StatsResult) -> NarrativeResult<String> {
    let narrator = state.narrator()?;
    state
        .within_timeout(narrator.calibration_summary(stats))
        .await
}

/// Brier score and calibration bins over all resolved predictions
#[utoipa::path(
    get,
    path = "/api/predictions/stats",
    params(StatsQuery),
    responses((status = 200, description = "Calibration statistics", body = StatsResponse)),
    tag = "Calibration"
)]
pub(crate) async fn get_stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<ApiResponse<StatsResponse>>, AppError> {
    let predictions = state.store.list(PredictionFilter::All).await?;
    let stats = compute_stats(&predictions);
    let mut response = StatsResponse::from(&stats);

    if query.ai_summary {
        match summarize(&state, &stats).await {
            Ok(summary) => response.ai_summary = Some(summary),
            Err(e) => {
                tracing::warn!("AI summary failed: {}", e);
                response.ai_summary_error = Some(summary_placeholder(&e));
            }
        }
    }

    Ok(Json(ApiResponse::success(response)))
}

/// Short narrative about one prediction
#[utoipa::path(
    get,
    path = "/api/predictions/{id}/insight",
    params(("id" = Uuid, Path, description = "Prediction id")),
    responses(
        (status = 200, description = "Insight text", body = InsightResponse),
        (status = 404, description = "No such prediction"),
        (status = 503, description = "Narrative provider unavailable")
    ),
    tag = "Calibration"
)]
pub(crate) async fn get_insight(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<InsightResponse>>, AppError> {
    let prediction = state.store.get(id).await?;
    let narrator = state.narrator()?;
    let insight = state
        .within_timeout(narrator.prediction_insight(&prediction))
        .await?;

    Ok(Json(ApiResponse::success(InsightResponse {
        prediction_id: id,
        insight,
    })))
}

/// Three predictions worth making next. Falls back to a fixed list when the
/// provider is missing or fails.
#[utoipa::path(
    post,
    path = "/api/predictions/suggestions",
    request_body(content = SuggestionsRequest, description = "Optional context"),
    responses(
        (status = 200, description = "Suggested predictions", body = SuggestionsResponse),
        (status = 400, description = "Malformed body")
    ),
    tag = "Calibration"
)]
pub(crate) async fn get_suggestions(
    State(state): State<AppState>,
    OptionalApiJson(body): OptionalApiJson<SuggestionsRequest>,
) -> Result<Json<ApiResponse<SuggestionsResponse>>, AppError> {
    let past = match body.and_then(|req| req.past_predictions) {
        Some(past) => past,
        None => state
            .store
            .list(PredictionFilter::All)
            .await?
            .into_iter()
            .take(SUGGESTION_CONTEXT_LIMIT)
            .map(|p| p.description)
            .collect(),
    };

    let generated = match state.narrator() {
        Ok(narrator) => {
            state
                .within_timeout(narrator.suggest_predictions(&past))
                .await
        }
        Err(e) => Err(e),
    };

    let (suggestions, source) = match generated {
        Ok(suggestions) => (suggestions, "ai"),
        Err(e) => {
            tracing::warn!("Using fallback suggestions: {}", e);
            (fallback_suggestions(), "fallback")
        }
    };

    Ok(Json(ApiResponse::success(SuggestionsResponse {
        suggestions: suggestions.into_iter().map(SuggestionView::from).collect(),
        source: source.to_string(),
    })))
}
