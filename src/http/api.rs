//! JSON API endpoints: current readings and the fan command.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;
use tracing::{error, info, warn};

use crate::{fan::FanError, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/readings", get(get_readings))
        .route("/fanon", get(turn_fan_on))
}

/// Serves the cached reading. Never triggers a sensor read: a momentarily
/// unreachable sensor degrades to stale data, not to an error response.
#[axum::debug_handler]
async fn get_readings(State(state): State<AppState>) -> Response {
    let reading = state.current_readings();
    match serde_json::to_value(reading) {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(err) => {
            error!(%err, "failed to serialize reading");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string())
        }
    }
}

/// Runs one full fan cycle before responding; the response is delayed until
/// the pin has been driven low again. Overlapping requests are rejected.
#[axum::debug_handler]
async fn turn_fan_on(State(state): State<AppState>) -> Response {
    let ticks = state.fan.cycle_ticks();
    match state.fan.run_cycle(ticks).await {
        Ok(()) => {
            info!(ticks, "fan cycle completed");
            (StatusCode::OK, Json(json!({ "message": "Fan turned on" }))).into_response()
        }
        Err(err @ FanError::Busy) => {
            warn!("rejected overlapping fan cycle");
            error_response(StatusCode::CONFLICT, &err.to_string())
        }
        Err(err) => {
            error!(%err, "fan cycle failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string())
        }
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}
