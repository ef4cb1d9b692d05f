use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    access,
    auth::CurrentUser,
    error::AppError,
    models::{
        stop::{Stop, StopInput, StopView},
        trip::Trip,
    },
    ordering::{validate_stop_orders, StopOrderInput},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_stops).post(create_stop))
        .route("/reorder", post(reorder_stops))
        .route(
            "/:stop_id",
            get(stop_detail).put(update_stop).delete(delete_stop),
        )
}

async fn list_stops(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user = current.require_user()?;
    access::require_trip_read(&state.db, trip_id, user.id).await?;
    let stops = Stop::list_for_trip(&state.db, trip_id).await?;
    Ok(Json(
        stops.into_iter().map(StopView::from).collect::<Vec<_>>(),
    ))
}

async fn create_stop(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<i64>,
    Json(input): Json<StopInput>,
) -> Result<impl IntoResponse, AppError> {
    let user = current.require_user()?;
    access::require_trip_write(&state.db, trip_id, user.id).await?;
    let stop = Stop::insert(&state.db, trip_id, &input).await?;
    Trip::recalculate_statistics(&state.db, &state.routes, trip_id).await?;
    Ok((StatusCode::CREATED, Json(StopView::from(stop))))
}

async fn stop_detail(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((trip_id, stop_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let user = current.require_user()?;
    access::require_trip_read(&state.db, trip_id, user.id).await?;
    let stop = Stop::fetch(&state.db, trip_id, stop_id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(StopView::from(stop)))
}

async fn update_stop(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((trip_id, stop_id)): Path<(i64, i64)>,
    Json(input): Json<StopInput>,
) -> Result<impl IntoResponse, AppError> {
    let user = current.require_user()?;
    access::require_trip_write(&state.db, trip_id, user.id).await?;
    let stop = Stop::update(&state.db, trip_id, stop_id, &input).await?;
    Trip::recalculate_statistics(&state.db, &state.routes, trip_id).await?;
    Ok(Json(StopView::from(stop)))
}

async fn delete_stop(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((trip_id, stop_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let user = current.require_user()?;
    access::require_trip_write(&state.db, trip_id, user.id).await?;
    Stop::delete(&state.db, trip_id, stop_id).await?;
    Trip::recalculate_statistics(&state.db, &state.routes, trip_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct ReorderPayload {
    stop_orders: Vec<StopOrderInput>,
}

/// Applies a whole reorder batch or nothing: the batch is validated first,
/// then every order update and the statistics refresh run in one transaction
/// each.
async fn reorder_stops(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<i64>,
    Json(payload): Json<ReorderPayload>,
) -> Result<impl IntoResponse, AppError> {
    let user = current.require_user()?;
    access::require_trip_write(&state.db, trip_id, user.id).await?;
    let orders = validate_stop_orders(&payload.stop_orders)?;
    Stop::apply_orders(&state.db, trip_id, &orders).await?;
    Trip::recalculate_statistics(&state.db, &state.routes, trip_id).await?;
    Ok(Json(json!({ "message": "stops reordered successfully" })))
}
