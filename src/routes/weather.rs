use axum::{
    extract::Query,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::{auth::CurrentUser, error::AppError, state::AppState};

const CONDITIONS: [&str; 5] = ["Sunny", "Partly Cloudy", "Light Rain", "Clear", "Overcast"];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/current", get(current_weather))
        .route("/forecast", get(forecast))
}

#[derive(Deserialize)]
struct LocationParams {
    lat: Option<f64>,
    lng: Option<f64>,
}

/// Placeholder weather values derived from the coordinates, pending a real
/// weather provider integration.
async fn current_weather(
    current: CurrentUser,
    Query(params): Query<LocationParams>,
) -> Result<impl IntoResponse, AppError> {
    current.require_user()?;
    let (lat, lng) = match (params.lat, params.lng) {
        (Some(lat), Some(lng)) => (lat, lng),
        _ => {
            return Err(AppError::validation(
                "latitude and longitude parameters are required",
            ))
        }
    };

    Ok(Json(json!({
        "location": format!("Location ({lat}, {lng})"),
        "current": {
            "temp_f": 65.0 + noise(lat, lng, 1.0) * 25.0,
            "condition": {
                "text": condition_for(lat, lng),
                "icon": "sunny",
            },
            "humidity": 40.0 + noise(lat, lng, 2.0) * 40.0,
            "wind_mph": noise(lat, lng, 3.0) * 15.0,
        },
    })))
}

#[derive(Deserialize)]
struct ForecastParams {
    /// Semicolon-separated "lat,lng" pairs, one per stop.
    stops: Option<String>,
}

async fn forecast(
    current: CurrentUser,
    Query(params): Query<ForecastParams>,
) -> Result<impl IntoResponse, AppError> {
    current.require_user()?;
    let stops = params
        .stops
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::validation("stops parameter is required"))?;

    let today = Utc::now().date_naive();
    let mut forecasts = Vec::new();
    for (index, pair) in stops.split(';').enumerate() {
        let Some((lat, lng)) = parse_coordinate_pair(pair) else {
            continue;
        };
        forecasts.push(json!({
            "location": format!("Stop {}", index + 1),
            "temperature": 65.0 + noise(lat, lng, 1.0) * 25.0,
            "condition": condition_for(lat, lng),
            "icon": "sunny",
            "humidity": 40.0 + noise(lat, lng, 2.0) * 40.0,
            "wind_speed": noise(lat, lng, 3.0) * 15.0,
            "date": (today + Duration::days(index as i64)).to_string(),
        }));
    }

    Ok(Json(json!({ "forecasts": forecasts })))
}

fn parse_coordinate_pair(pair: &str) -> Option<(f64, f64)> {
    let (lat, lng) = pair.split_once(',')?;
    Some((lat.trim().parse().ok()?, lng.trim().parse().ok()?))
}

/// Deterministic pseudo-random value in [0, 1) from the coordinates.
fn noise(lat: f64, lng: f64, salt: f64) -> f64 {
    ((lat * 31.7 + lng * 17.3 + salt * 7.9).sin() + 1.0) / 2.0
}

fn condition_for(lat: f64, lng: f64) -> &'static str {
    let index = (noise(lat, lng, 4.0) * CONDITIONS.len() as f64) as usize;
    CONDITIONS[index.min(CONDITIONS.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noise_stays_in_unit_interval() {
        for &(lat, lng) in &[(0.0, 0.0), (36.1, -112.1), (-89.9, 179.9)] {
            let value = noise(lat, lng, 1.0);
            assert!((0.0..1.0).contains(&value), "noise out of range: {value}");
        }
    }

    #[test]
    fn coordinate_pairs_parse_loosely() {
        assert_eq!(parse_coordinate_pair("36.1,-112.1"), Some((36.1, -112.1)));
        assert_eq!(parse_coordinate_pair(" 1.5 , 2.5 "), Some((1.5, 2.5)));
        assert_eq!(parse_coordinate_pair("garbage"), None);
    }
}
