use axum::{extract::State, routing::get, Json, Router};
use forecast_core::{Profile, ProfileUpdate};

use crate::{ApiJson, ApiResponse, AppError, AppState};

pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/api/profile", get(get_profile).put(update_profile))
}

#[utoipa::path(
    get,
    path = "/api/profile",
    responses((status = 200, description = "The user profile", body = Profile)),
    tag = "Profile"
)]
pub(crate) async fn get_profile(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Profile>>, AppError> {
    let profile = state.store.get_profile().await?;
    Ok(Json(ApiResponse::success(profile)))
}

/// Partial update: only the fields present in the body change
#[utoipa::path(
    put,
    path = "/api/profile",
    request_body = ProfileUpdate,
    responses(
        (status = 200, description = "Updated profile", body = Profile),
        (status = 400, description = "Validation failed")
    ),
    tag = "Profile"
)]
pub(crate) async fn update_profile(
    State(state): State<AppState>,
    ApiJson(update): ApiJson<ProfileUpdate>,
) -> Result<Json<ApiResponse<Profile>>, AppError> {
    let profile = state.store.update_profile(update).await?;
    tracing::info!("Profile updated");
    Ok(Json(ApiResponse::success(profile)))
}
