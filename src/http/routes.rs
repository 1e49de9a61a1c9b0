//! HTTP route definitions

use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path, State},
    http::{header, HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{
    compression::CompressionLayer, services::ServeDir, set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::error;

use crate::app::{AppState, GameStateView, JoinOutcome, MapSummary};
use crate::error::GameError;
use crate::game::{MapDefinition, MapId};
use crate::http::middleware::{require_token, AuthenticatedPlayer};
use crate::util::time::uptime_secs;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/api/v1/maps", get(list_maps_handler))
        .route("/api/v1/maps/:id", get(map_handler))
        .route("/api/v1/game/join", post(join_handler))
        .route("/api/v1/game/tick", post(tick_handler));

    // Protected routes (bearer token required)
    let protected_routes = Router::new()
        .route("/api/v1/game/players", get(players_handler))
        .route("/api/v1/game/state", get(state_handler))
        .route("/api/v1/game/player/action", post(action_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_token));

    let mut router = Router::new().merge(public_routes).merge(protected_routes);

    // Frontend files for any path no route matches
    if let Some(root) = &state.config.www_root {
        router = router.fallback_service(ServeDir::new(root));
    }

    router
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache"),
        ))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    active_sessions: usize,
    players: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        active_sessions: state.engine.world().session_count(),
        players: state.engine.players().len(),
    })
}

// ============================================================================
// Map endpoints
// ============================================================================

async fn list_maps_handler(State(state): State<AppState>) -> Json<Vec<MapSummary>> {
    Json(state.engine.list_maps())
}

async fn map_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MapDefinition>, AppError> {
    let map = state.engine.map_description(&MapId::new(id))?;
    Ok(Json(MapDefinition::clone(&map)))
}

// ============================================================================
// Game endpoints
// ============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JoinRequest {
    user_name: String,
    map_id: String,
}

async fn join_handler(
    State(state): State<AppState>,
    payload: Result<Json<JoinRequest>, JsonRejection>,
) -> Result<Json<JoinOutcome>, AppError> {
    let Json(req) = payload?;
    let outcome = state.engine.join_game(
        &req.user_name,
        &MapId::new(req.map_id),
        state.spawn_strategy(),
    )?;
    Ok(Json(outcome))
}

async fn players_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedPlayer>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.engine.session_roster(&auth.player)?))
}

async fn state_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedPlayer>,
) -> Result<Json<GameStateView>, AppError> {
    Ok(Json(state.engine.player_game_state(&auth.player)?))
}

#[derive(Deserialize)]
struct ActionRequest {
    #[serde(rename = "move")]
    move_code: String,
}

async fn action_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedPlayer>,
    payload: Result<Json<ActionRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Json(req) = payload?;
    state
        .engine
        .set_player_action(&auth.player, &req.move_code)?;
    Ok(Json(serde_json::json!({})))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TickRequest {
    /// Milliseconds
    time_delta: u64,
}

async fn tick_handler(
    State(state): State<AppState>,
    payload: Result<Json<TickRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    if state.auto_tick() {
        return Err(AppError::BadRequest(
            "Time is advanced by the server ticker".to_string(),
        ));
    }
    let Json(req) = payload?;
    state
        .engine
        .tick(Duration::from_millis(req.time_delta))?;
    Ok(Json(serde_json::json!({})))
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Game(#[from] GameError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidArgument(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, code) = match &self {
            AppError::Game(GameError::UnknownMap(_)) => (StatusCode::NOT_FOUND, "mapNotFound"),
            AppError::Game(GameError::InvalidToken) => (StatusCode::UNAUTHORIZED, "unknownToken"),
            AppError::Game(GameError::InvalidMoveCode(_) | GameError::InvalidName) => {
                (StatusCode::BAD_REQUEST, "invalidArgument")
            }
            AppError::Game(e) => {
                error!(error = %e, internal = e.is_internal(), "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internalError")
            }
            AppError::InvalidArgument(_) => (StatusCode::BAD_REQUEST, "invalidArgument"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "badRequest"),
        };

        let body = serde_json::json!({
            "code": code,
            "message": self.to_string(),
        });

        (status, Json(body)).into_response()
    }
}
