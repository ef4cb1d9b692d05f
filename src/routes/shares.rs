use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use crate::{
    access,
    auth::CurrentUser,
    db::DbPool,
    error::AppError,
    models::{
        share::{ShareInput, ShareUpdate, TripShare},
        trip::Trip,
    },
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_shares).post(create_share))
        .route(
            "/:share_id",
            get(share_detail).put(update_share).delete(delete_share),
        )
}

async fn owned_trip(db: &DbPool, trip_id: i64, user_id: i64) -> Result<Trip, AppError> {
    let trip = Trip::fetch(db, trip_id).await?.ok_or(AppError::NotFound)?;
    access::require_owner(&trip, user_id)?;
    Ok(trip)
}

async fn list_shares(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user = current.require_user()?;
    owned_trip(&state.db, trip_id, user.id).await?;
    let shares = TripShare::list_active_for_trip(&state.db, trip_id).await?;
    Ok(Json(shares))
}

async fn create_share(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<i64>,
    Json(input): Json<ShareInput>,
) -> Result<impl IntoResponse, AppError> {
    let user = current.require_user()?;
    owned_trip(&state.db, trip_id, user.id).await?;
    let share =
        TripShare::create(&state.db, trip_id, &input.shared_with_email, user.id, &input).await?;
    let view = TripShare::fetch_view(&state.db, trip_id, share.id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn share_detail(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((trip_id, share_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let user = current.require_user()?;
    owned_trip(&state.db, trip_id, user.id).await?;
    let view = TripShare::fetch_view(&state.db, trip_id, share_id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(view))
}

async fn update_share(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((trip_id, share_id)): Path<(i64, i64)>,
    Json(update): Json<ShareUpdate>,
) -> Result<impl IntoResponse, AppError> {
    let user = current.require_user()?;
    owned_trip(&state.db, trip_id, user.id).await?;
    TripShare::update(&state.db, trip_id, share_id, &update).await?;
    let view = TripShare::fetch_view(&state.db, trip_id, share_id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(view))
}

async fn delete_share(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((trip_id, share_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let user = current.require_user()?;
    owned_trip(&state.db, trip_id, user.id).await?;
    TripShare::delete(&state.db, trip_id, share_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
