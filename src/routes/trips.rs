use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    access::{self, TripAccess},
    auth::CurrentUser,
    db::DbPool,
    error::AppError,
    models::{
        stop::{Stop, StopView},
        trip::{Trip, TripInput},
        user::User,
    },
    state::AppState,
};

use super::{shares, stops};

const PUBLIC_PAGE_SIZE: i64 = 20;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_trips).post(create_trip))
        .route("/shared", get(shared_trips))
        .route("/public", get(public_trips))
        .route(
            "/:trip_id",
            get(trip_detail).put(update_trip).delete(delete_trip),
        )
        .route("/:trip_id/calculate", post(calculate_statistics))
        .nest("/:trip_id/stops", stops::router())
        .nest("/:trip_id/shares", shares::router())
}

async fn list_trips(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let user = current.require_user()?;
    let trips = Trip::list_visible_to(&state.db, user.id).await?;
    Ok(Json(trips))
}

async fn create_trip(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(input): Json<TripInput>,
) -> Result<impl IntoResponse, AppError> {
    let user = current.require_user()?;
    let trip = Trip::insert(&state.db, user.id, &input).await?;
    let detail = trip_payload(&state.db, trip).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

async fn trip_detail(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user = current.require_user()?;
    let trip = access::require_trip_read(&state.db, trip_id, user.id).await?;
    Ok(Json(trip_payload(&state.db, trip).await?))
}

async fn update_trip(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<i64>,
    Json(input): Json<TripInput>,
) -> Result<impl IntoResponse, AppError> {
    let user = current.require_user()?;
    access::require_trip_write(&state.db, trip_id, user.id).await?;
    let trip = Trip::update(&state.db, trip_id, &input).await?;
    Ok(Json(trip_payload(&state.db, trip).await?))
}

async fn delete_trip(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user = current.require_user()?;
    access::require_trip_write(&state.db, trip_id, user.id).await?;
    Trip::delete(&state.db, trip_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Manual statistics recalculation. Owners and shared users (any level) may
/// trigger it; a public trip alone is not enough since it rewrites rows.
async fn calculate_statistics(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user = current.require_user()?;
    let trip = Trip::fetch(&state.db, trip_id)
        .await?
        .ok_or(AppError::NotFound)?;
    match access::trip_access(&state.db, &trip, user.id).await? {
        Some(TripAccess::Owner) | Some(TripAccess::Shared(_)) => {}
        Some(TripAccess::PublicRead) => return Err(AppError::Forbidden),
        None => return Err(AppError::NotFound),
    }
    let trip = Trip::recalculate_statistics(&state.db, &state.routes, trip_id).await?;
    Ok(Json(trip_payload(&state.db, trip).await?))
}

async fn shared_trips(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let user = current.require_user()?;
    let trips = Trip::list_shared_with(&state.db, user.id).await?;
    Ok(Json(trips))
}

#[derive(Deserialize)]
struct PublicQuery {
    page: Option<i64>,
}

async fn public_trips(
    State(state): State<AppState>,
    Query(query): Query<PublicQuery>,
) -> Result<impl IntoResponse, AppError> {
    let count = Trip::count_public(&state.db).await?;
    let num_pages = ((count + PUBLIC_PAGE_SIZE - 1) / PUBLIC_PAGE_SIZE).max(1);
    let page = query.page.unwrap_or(1).clamp(1, num_pages);
    let results =
        Trip::list_public(&state.db, PUBLIC_PAGE_SIZE, (page - 1) * PUBLIC_PAGE_SIZE).await?;

    Ok(Json(json!({
        "results": results,
        "count": count,
        "num_pages": num_pages,
        "current_page": page,
        "has_next": page < num_pages,
        "has_previous": page > 1,
    })))
}

/// Full trip payload: row fields plus derived values and the ordered stops.
#[derive(Debug, Serialize)]
struct TripDetail {
    #[serde(flatten)]
    trip: Trip,
    user_name: String,
    duration_days: Option<i64>,
    stops_count: i64,
    stops: Vec<StopView>,
}

async fn trip_payload(db: &DbPool, trip: Trip) -> Result<TripDetail, AppError> {
    let owner = User::find_by_id(db, trip.user_id)
        .await?
        .ok_or(AppError::NotFound)?;
    let stops = Stop::list_for_trip(db, trip.id).await?;
    let stops_count = stops.len() as i64;
    Ok(TripDetail {
        user_name: owner.full_name(),
        duration_days: trip.duration_days(),
        stops_count,
        stops: stops.into_iter().map(StopView::from).collect(),
        trip,
    })
}
