//! REST API and SSE routes

use crate::state::AppState;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use cst_adapters::FlightPhase;
use cst_core::mode::{ModeOptions, OperatingMode};
use cst_core::model::SensorMask;
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tokio_stream::wrappers::WatchStream;
use tower_http::cors::CorsLayer;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/snapshot", get(get_snapshot))
        .route("/api/snapshot/stream", get(snapshot_stream))
        .route("/api/mode", get(get_mode).post(set_mode))
        .route("/api/mode/stop", post(stop_mode))
        .route("/api/status", get(get_status))
        .route("/api/flight/descend", post(begin_descent))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// === Snapshot Endpoints ===

#[derive(Deserialize)]
struct SnapshotQuery {
    /// Comma-separated sensor kinds, e.g. `gps,inertial`
    sensors: Option<String>,
}

async fn get_snapshot(
    State(state): State<AppState>,
    Query(query): Query<SnapshotQuery>,
) -> Result<Response, (StatusCode, String)> {
    let mask = query.sensors.map(|s| SensorMask::parse(&s));
    let json = state
        .engine
        .current_snapshot()
        .to_json_filtered(mask.as_ref())
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to serialize snapshot: {}", e),
            )
        })?;

    Ok(([(header::CONTENT_TYPE, "application/json")], json).into_response())
}

async fn snapshot_stream(
    State(state): State<AppState>,
    Query(query): Query<SnapshotQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.subscribe();
    let mask = query.sensors.map(|s| SensorMask::parse(&s));

    // Starts with the current snapshot, then one event per publish.
    // A slow client skips intermediate snapshots rather than queueing them.
    let stream = WatchStream::new(rx).filter_map(move |snapshot| {
        let mask = mask.clone();
        async move {
            match snapshot.to_json_filtered(mask.as_ref()) {
                Ok(json) => Some(Ok(Event::default().data(json))),
                Err(e) => {
                    tracing::error!("Failed to serialize snapshot: {}", e);
                    None
                }
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

// === Mode Endpoints ===

#[derive(Serialize)]
struct ModeInfo {
    mode: OperatingMode,
    connected: bool,
}

fn mode_info(state: &AppState) -> ModeInfo {
    ModeInfo {
        mode: state.engine.active_mode(),
        connected: state.engine.connection_status(),
    }
}

async fn get_mode(State(state): State<AppState>) -> Json<ModeInfo> {
    Json(mode_info(&state))
}

#[derive(Deserialize)]
struct ModeRequest {
    mode: OperatingMode,
    #[serde(default)]
    options: ModeOptions,
}

async fn set_mode(
    State(state): State<AppState>,
    Json(request): Json<ModeRequest>,
) -> Json<ModeInfo> {
    state.engine.start_mode(request.mode, request.options).await;
    Json(mode_info(&state))
}

async fn stop_mode(State(state): State<AppState>) -> Json<ModeInfo> {
    state.engine.stop().await;
    Json(mode_info(&state))
}

// === Status Endpoints ===

#[derive(Serialize)]
struct StatusInfo {
    connected: bool,
    mode: OperatingMode,
    link: String,
    flight_phase: Option<FlightPhase>,
    tick_count: u64,
}

async fn get_status(State(state): State<AppState>) -> Json<StatusInfo> {
    let engine = &state.engine;
    Json(StatusInfo {
        connected: engine.connection_status(),
        mode: engine.active_mode(),
        link: engine.link_name().to_string(),
        flight_phase: engine.flight_phase().await,
        tick_count: engine.tick_count(),
    })
}

// === Flight Endpoints ===

async fn begin_descent(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    state
        .engine
        .begin_descent()
        .await
        .map_err(|e| (StatusCode::CONFLICT, e.to_string()))?;

    Ok(Json(serde_json::json!({ "phase": FlightPhase::Descent })))
}
