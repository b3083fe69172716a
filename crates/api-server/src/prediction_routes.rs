//! Prediction lifecycle routes: create, list, read, resolve, delete.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use forecast_core::{NewPrediction, Prediction, PredictionFilter};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiJson, ApiResponse, AppError, AppState};

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// `all` (default), `pending` or `resolved`
    #[serde(default)]
    pub status: PredictionFilter,
}

/// Body of a resolve call
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ResolveRequest {
    /// Whether the predicted event happened
    #[serde(default)]
    pub outcome: Option<bool>,
}

pub fn prediction_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/predictions",
            get(list_predictions).post(create_prediction),
        )
        .route(
            "/api/predictions/:id",
            get(get_prediction).delete(delete_prediction),
        )
        .route("/api/predictions/:id/resolve", post(resolve_prediction))
}

/// List predictions, newest first
#[utoipa::path(
    get,
    path = "/api/predictions",
    params(ListQuery),
    responses((status = 200, description = "Predictions, newest first", body = [Prediction])),
    tag = "Predictions"
)]
pub(crate) async fn list_predictions(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<Prediction>>>, AppError> {
    let predictions = state.store.list(query.status).await?;
    Ok(Json(ApiResponse::success(predictions)))
}

/// Log a new prediction
#[utoipa::path(
    post,
    path = "/api/predictions",
    request_body = NewPrediction,
    responses(
        (status = 201, description = "Prediction created", body = Prediction),
        (status = 400, description = "Validation failed")
    ),
    tag = "Predictions"
)]
pub(crate) async fn create_prediction(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<NewPrediction>,
) -> Result<(StatusCode, Json<ApiResponse<Prediction>>), AppError> {
    let prediction = state.store.create(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(prediction))))
}

#[utoipa::path(
    get,
    path = "/api/predictions/{id}",
    params(("id" = Uuid, Path, description = "Prediction id")),
    responses(
        (status = 200, description = "The prediction", body = Prediction),
        (status = 404, description = "No such prediction")
    ),
    tag = "Predictions"
)]
pub(crate) async fn get_prediction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Prediction>>, AppError> {
    let prediction = state.store.get(id).await?;
    Ok(Json(ApiResponse::success(prediction)))
}

#[utoipa::path(
    delete,
    path = "/api/predictions/{id}",
    params(("id" = Uuid, Path, description = "Prediction id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "No such prediction")
    ),
    tag = "Predictions"
)]
pub(crate) async fn delete_prediction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.store.delete(id).await?;
    tracing::info!(%id, "Deleted prediction");
    Ok(StatusCode::NO_CONTENT)
}

/// Record the outcome of a pending prediction. Outcomes are final.
#[utoipa::path(
    post,
    path = "/api/predictions/{id}/resolve",
    params(("id" = Uuid, Path, description = "Prediction id")),
    request_body = ResolveRequest,
    responses(
        (status = 200, description = "Resolved prediction", body = Prediction),
        (status = 400, description = "Outcome missing"),
        (status = 404, description = "No such prediction"),
        (status = 409, description = "Already resolved")
    ),
    tag = "Predictions"
)]
pub(crate) async fn resolve_prediction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(request): ApiJson<ResolveRequest>,
) -> Result<Json<ApiResponse<Prediction>>, AppError> {
    let outcome = request
        .outcome
        .ok_or_else(|| AppError::bad_request("outcome is required"))?;

    let prediction = state.store.resolve(id, outcome).await?;
    tracing::info!(%id, outcome, "Resolved prediction");
    Ok(Json(ApiResponse::success(prediction)))
}
