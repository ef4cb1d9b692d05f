use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::{auth::CurrentUser, error::AppError, state::AppState};

const DEFAULT_SEARCH_RADIUS_M: u32 = 50_000;
const DEFAULT_NEARBY_RADIUS_M: u32 = 5_000;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/search", get(search))
        .route("/nearby", get(nearby))
        .route("/:place_id", get(details))
}

#[derive(Deserialize)]
struct SearchParams {
    q: Option<String>,
    lat: Option<f64>,
    lng: Option<f64>,
    radius: Option<u32>,
    #[serde(rename = "type")]
    place_type: Option<String>,
}

async fn search(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, AppError> {
    current.require_user()?;
    let query = params
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::validation("query parameter 'q' is required"))?;
    let location = match (params.lat, params.lng) {
        (Some(lat), Some(lng)) => Some((lat, lng)),
        _ => None,
    };
    let results = state
        .places
        .search(
            query,
            location,
            params.radius.unwrap_or(DEFAULT_SEARCH_RADIUS_M),
            params.place_type.as_deref(),
        )
        .await?;
    Ok(Json(json!({ "results": results })))
}

#[derive(Deserialize)]
struct NearbyParams {
    lat: Option<f64>,
    lng: Option<f64>,
    radius: Option<u32>,
    #[serde(rename = "type")]
    place_type: Option<String>,
}

async fn nearby(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(params): Query<NearbyParams>,
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
    let results = state
        .places
        .nearby(
            lat,
            lng,
            params.radius.unwrap_or(DEFAULT_NEARBY_RADIUS_M),
            params.place_type.as_deref(),
        )
        .await?;
    Ok(Json(json!({ "results": results })))
}

async fn details(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(place_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    current.require_user()?;
    let place = state
        .places
        .details(&place_id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(place))
}
