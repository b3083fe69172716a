//! HTTP service for the prediction calibration tracker.
//!
//! Wires the record store, the calibration engine and the optional narrative
//! provider behind an axum router. Every body uses the
//! `{ "success", "data", "error" }` envelope.

mod calibration_routes;
pub mod config;
mod prediction_routes;
mod profile_routes;
mod request_id;


use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    extract::{rejection::JsonRejection, FromRequest},
    http::{HeaderValue, Request, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use forecast_core::ForecastError;
use narrative_client::{GeminiClient, NarrativeError, NarrativeProvider, NarrativeResult};
use prediction_store::PredictionStore;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use utoipa::OpenApi;

pub use config::{ConfigError, ServerConfig};
pub use request_id::RequestId;

const DEFAULT_LOG_FILTER: &str = "api_server=info,prediction_store=info,tower_http=info";

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub store: PredictionStore,
    /// `None` when no text-generation service is configured
    pub narrator: Option<Arc<dyn NarrativeProvider>>,
    pub narrative_timeout: Duration,
}

impl AppState {
    pub fn new(store: PredictionStore) -> Self {
        Self {
            store,
            narrator: None,
            narrative_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_narrator(mut self, narrator: Arc<dyn NarrativeProvider>) -> Self {
        self.narrator = Some(narrator);
        self
    }

    pub fn with_narrative_timeout(mut self, timeout: Duration) -> Self {
        self.narrative_timeout = timeout;
        self
    }

    pub(crate) fn narrator(&self) -> NarrativeResult<&dyn NarrativeProvider> {
        self.narrator.as_deref().ok_or(NarrativeError::NotConfigured)
    }

    /// Bound a narrative call by the configured timeout
    pub(crate) async fn within_timeout<T>(
        &self,
        call: impl Future<Output = NarrativeResult<T>>,
    ) -> NarrativeResult<T> {
        tokio::time::timeout(self.narrative_timeout, call)
            .await
            .unwrap_or_else(|_| Err(NarrativeError::Timeout))
    }
}

/// Response envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Handler error carrying the HTTP status it should be reported with
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    error: anyhow::Error,
}

impl AppError {
    pub fn with_status(status: StatusCode, error: impl Into<anyhow::Error>) -> Self {
        Self {
            status,
            error: error.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, anyhow::anyhow!(message.into()))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, error)
    }
}

impl From<ForecastError> for AppError {
    fn from(err: ForecastError) -> Self {
        let status = match &err {
            ForecastError::NotFound(_) => StatusCode::NOT_FOUND,
            ForecastError::AlreadyResolved(_) => StatusCode::CONFLICT,
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::with_status(status, err)
    }
}

impl From<NarrativeError> for AppError {
    fn from(err: NarrativeError) -> Self {
        Self::with_status(StatusCode::SERVICE_UNAVAILABLE, err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = if self.status.is_server_error()
            && self.status != StatusCode::SERVICE_UNAVAILABLE
        {
            tracing::error!("Request failed: {:#}", self.error);
            "Internal server error".to_string()
        } else {
            tracing::debug!("Request rejected ({}): {}", self.status, self.error);
            self.error.to_string()
        };

        (self.status, Json(ApiResponse::<()>::error(message))).into_response()
    }
}

/// JSON body extractor whose rejections use the error envelope (400)
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Like [`ApiJson`], but an empty body yields `None`. A body that is present
/// must still parse.
pub struct OptionalApiJson<T>(pub Option<T>);

#[axum::async_trait]
impl<T, S> FromRequest<S> for OptionalApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: axum::extract::Request, state: &S) -> Result<Self, AppError> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::bad_request(e.body_text()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self(None));
        }
        let Json(value) = Json::<T>::from_bytes(&bytes)?;
        Ok(Self(Some(value)))
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub narrative_backend: Option<String>,
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse)),
    tag = "System"
)]
pub(crate) async fn health(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::success(HealthResponse {
        status: "ok".to_string(),
        narrative_backend: state.narrator.as_ref().map(|n| n.backend_name().to_string()),
    }))
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Calibration Tracker API",
        description = "Log probabilistic predictions, resolve them, and measure calibration."
    ),
    paths(
        health,
        prediction_routes::list_predictions,
        prediction_routes::create_prediction,
        prediction_routes::get_prediction,
        prediction_routes::delete_prediction,
        prediction_routes::resolve_prediction,
        calibration_routes::get_stats,
        calibration_routes::get_insight,
        calibration_routes::get_suggestions,
        profile_routes::get_profile,
        profile_routes::update_profile,
    ),
    components(schemas(
        forecast_core::Prediction,
        forecast_core::NewPrediction,
        forecast_core::PredictionFilter,
        forecast_core::Profile,
        forecast_core::ProfileUpdate,
        prediction_routes::ResolveRequest,
        calibration_routes::StatsResponse,
        calibration_routes::BinView,
        calibration_routes::InsightResponse,
        calibration_routes::SuggestionsRequest,
        calibration_routes::SuggestionsResponse,
        calibration_routes::SuggestionView,
        HealthResponse,
    )),
    tags(
        (name = "Predictions", description = "Prediction lifecycle"),
        (name = "Calibration", description = "Calibration statistics and narratives"),
        (name = "Profile", description = "Single-user profile"),
        (name = "System", description = "Service health")
    )
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if allowed_origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(origins)
}

/// Build the full application router
pub fn build_router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/openapi.json", get(openapi_json))
        .merge(calibration_routes::calibration_routes())
        .merge(prediction_routes::prediction_routes())
        .merge(profile_routes::profile_routes())
        .layer(middleware::from_fn(request_id::request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

/// Install the global subscriber. `RUST_LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let json = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer())
            .init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ServerConfig::from_env()?;
    let store = PredictionStore::connect(&config.database_url).await?;

    let mut state = AppState::new(store).with_narrative_timeout(config.narrative_timeout);
    match config.narrative.clone() {
        Some(narrative) => {
            let client = GeminiClient::new(narrative)?;
            tracing::info!("AI narratives enabled (model {})", client.model());
            state = state.with_narrator(Arc::new(client));
        }
        None => tracing::info!("GEMINI_API_KEY not set, AI narratives disabled"),
    }

    let app = build_router(state, &config.cors_allowed_origins);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Calibration tracker listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
