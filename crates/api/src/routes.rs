use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use chrono::{NaiveDate, Utc};
use courtside_db::ModelVersionRepository;
use courtside_models::{
    AccuracySummary, FeatureVector, GameResult, ModelVersionRecord, PredictionRecord,
    PredictionRequest,
};
use courtside_services::{PredictionOutcome, PredictionService, ServiceMetrics, SettlementOutcome};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PredictionService>,
    pub versions: Arc<dyn ModelVersionRepository>,
    pub metrics: Arc<ServiceMetrics>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        service: Arc<PredictionService>,
        versions: Arc<dyn ModelVersionRepository>,
        metrics: Arc<ServiceMetrics>,
    ) -> Self {
        Self {
            service,
            versions,
            metrics,
            started_at: Instant::now(),
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub pagination: Option<PaginationInfo>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            message: None,
            error: None,
            pagination: None,
        })
    }
}

#[derive(Serialize, Deserialize)]
pub struct PaginationInfo {
    pub limit: usize,
    pub returned: usize,
}

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    pub model_version: Option<String>,
    pub timestamp: String,
    pub version: String,
    pub uptime_seconds: u64,
}

#[derive(Deserialize)]
pub struct HistoryParams {
    pub limit: Option<usize>,
}

#[derive(Deserialize)]
pub struct UpcomingParams {
    pub date: Option<NaiveDate>,
}

#[derive(Deserialize)]
pub struct PlayerFeatureParams {
    pub opponent_team_id: i64,
    pub date: Option<NaiveDate>,
}

#[derive(Serialize, Deserialize)]
pub struct ModelsResponse {
    pub active_version: Option<String>,
    pub versions: Vec<ModelVersionRecord>,
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

pub fn create_routes() -> Router<AppState> {
    Router::new()
        // Health and metrics
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))

        // Predictions
        .route("/api/v1/predictions", post(create_prediction))
        .route("/api/v1/predictions/history/:user_id", get(prediction_history))
        .route("/api/v1/predictions/accuracy/:user_id", get(prediction_accuracy))

        // Games
        .route("/api/v1/games/upcoming", get(upcoming_games))
        .route("/api/v1/games/results", post(record_game_result))

        // Players
        .route("/api/v1/players/:player_id/features", get(player_features))

        // Models
        .route("/api/v1/models", get(list_models))
}

/// Routes with state, CORS and request tracing applied.
pub fn create_app(state: AppState, cors_origins: &[String]) -> Router {
    create_routes()
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    base.allow_origin(allowed)
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let health = state.service.registry().health();
    Json(HealthResponse {
        status: if health.model_loaded { "healthy" } else { "degraded" }.to_string(),
        model_loaded: health.model_loaded,
        model_version: health.model_version,
        timestamp: Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    })
}

async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    state
        .metrics
        .set_model_loaded(state.service.registry().is_loaded());
    let body = state.metrics.render()?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    ))
}

async fn create_prediction(
    State(state): State<AppState>,
    Json(request): Json<PredictionRequest>,
) -> ApiResult<PredictionOutcome> {
    let outcome = state.service.predict(request).await?;
    Ok(ApiResponse::ok(outcome))
}

async fn prediction_history(
    Path(user_id): Path<String>,
    Query(params): Query<HistoryParams>,
    State(state): State<AppState>,
) -> ApiResult<Vec<PredictionRecord>> {
    let history = state.service.history(&user_id, params.limit).await?;
    let returned = history.len();

    Ok(Json(ApiResponse {
        success: true,
        data: Some(history),
        message: None,
        error: None,
        pagination: Some(PaginationInfo {
            limit: state.service.history_limit(params.limit),
            returned,
        }),
    }))
}

async fn prediction_accuracy(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<AccuracySummary> {
    Ok(ApiResponse::ok(state.service.accuracy(&user_id).await?))
}

async fn upcoming_games(
    Query(params): Query<UpcomingParams>,
    State(state): State<AppState>,
) -> ApiResult<Value> {
    let date = params.date.unwrap_or_else(|| Utc::now().date_naive());
    Ok(ApiResponse::ok(state.service.upcoming_games(date).await?))
}

async fn record_game_result(
    State(state): State<AppState>,
    Json(result): Json<GameResult>,
) -> ApiResult<SettlementOutcome> {
    Ok(ApiResponse::ok(state.service.settle_game(result).await?))
}

async fn player_features(
    Path(player_id): Path<i64>,
    Query(params): Query<PlayerFeatureParams>,
    State(state): State<AppState>,
) -> ApiResult<FeatureVector> {
    let date = params.date.unwrap_or_else(|| Utc::now().date_naive());
    let features = state
        .service
        .player_features(player_id, params.opponent_team_id, date)
        .await?;
    Ok(ApiResponse::ok(features))
}

async fn list_models(State(state): State<AppState>) -> ApiResult<ModelsResponse> {
    let versions = state.versions.list_versions().await?;
    Ok(ApiResponse::ok(ModelsResponse {
        active_version: state.service.registry().current_version(),
        versions,
    }))
}
