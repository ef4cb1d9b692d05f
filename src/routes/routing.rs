use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{auth::CurrentUser, error::AppError, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/calculate", post(calculate))
        .route("/:route_id", get(route_detail))
}

#[derive(Deserialize)]
struct CalculatePayload {
    #[serde(default)]
    waypoints: Vec<Value>,
}

/// Route calculation between waypoints. The waypoints are echoed back as
/// given; distances come from the flat estimator until a real directions
/// provider lands.
async fn calculate(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(payload): Json<CalculatePayload>,
) -> Result<impl IntoResponse, AppError> {
    current.require_user()?;
    if payload.waypoints.len() < 2 {
        return Err(AppError::validation("at least 2 waypoints are required"));
    }

    let estimator = &state.routes;
    let leg_count = payload.waypoints.len() - 1;
    let leg_duration = estimator.miles_per_leg / estimator.average_speed_mph;
    let legs: Vec<Value> = (0..leg_count)
        .map(|_| {
            json!({
                "distance": {
                    "text": format!("{} miles", estimator.miles_per_leg),
                    "value": estimator.miles_per_leg,
                },
                "duration": {
                    "text": format!("{leg_duration} hours"),
                    "value": leg_duration,
                },
            })
        })
        .collect();

    Ok(Json(json!({
        "total_distance": estimator.miles_per_leg * leg_count as f64,
        "total_time": leg_duration * leg_count as f64,
        "waypoints": payload.waypoints,
        "legs": legs,
    })))
}

async fn route_detail(
    current: CurrentUser,
    Path(route_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    current.require_user()?;
    Ok(Json(json!({
        "id": route_id,
        "total_distance": 450,
        "total_time": 7.5,
        "status": "calculated",
    })))
}
