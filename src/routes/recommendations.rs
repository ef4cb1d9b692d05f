use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::{auth::CurrentUser, error::AppError, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(recommendations))
        .route("/nearby", get(nearby_recommendations))
}

#[derive(Deserialize)]
struct RecommendationParams {
    lat: Option<f64>,
    lng: Option<f64>,
    #[serde(rename = "type")]
    place_type: Option<String>,
}

fn required_location(params: &RecommendationParams) -> Result<(f64, f64), AppError> {
    match (params.lat, params.lng) {
        (Some(lat), Some(lng)) => Ok((lat, lng)),
        _ => Err(AppError::validation(
            "latitude and longitude parameters are required",
        )),
    }
}

/// Attractions, restaurants, and lodging around a point, composed from
/// nearby place searches.
async fn recommendations(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(params): Query<RecommendationParams>,
) -> Result<impl IntoResponse, AppError> {
    current.require_user()?;
    let (lat, lng) = required_location(&params)?;

    let mut attractions = state
        .places
        .nearby(lat, lng, 10_000, Some("tourist_attraction"))
        .await?;
    let mut restaurants = state.places.nearby(lat, lng, 5_000, Some("restaurant")).await?;
    let mut accommodations = state.places.nearby(lat, lng, 15_000, Some("lodging")).await?;
    attractions.truncate(5);
    restaurants.truncate(5);
    accommodations.truncate(3);

    Ok(Json(json!({
        "attractions": attractions,
        "restaurants": restaurants,
        "accommodations": accommodations,
    })))
}

async fn nearby_recommendations(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(params): Query<RecommendationParams>,
) -> Result<impl IntoResponse, AppError> {
    current.require_user()?;
    let (lat, lng) = required_location(&params)?;
    let place_type = params.place_type.as_deref().unwrap_or("tourist_attraction");
    let results = state.places.nearby(lat, lng, 5_000, Some(place_type)).await?;
    Ok(Json(json!({ "results": results })))
}
