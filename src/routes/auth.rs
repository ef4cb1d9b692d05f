use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use axum_extra::extract::cookie::PrivateCookieJar;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::{
    auth::{self, CurrentUser, RegisterInput},
    error::AppError,
    models::user::{ProfileUpdate, User, UserProfile},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/profile", get(profile).put(update_profile))
        .route("/preferences", put(update_preferences))
}

async fn register(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Json(input): Json<RegisterInput>,
) -> Result<impl IntoResponse, AppError> {
    let user = auth::register_user(&state.db, &input).await?;
    let session_id = auth::create_session(&state.db, user.id).await?;
    Ok((
        StatusCode::CREATED,
        auth::apply_session_cookie(jar, &session_id),
        Json(json!({ "user": UserProfile::from(&user) })),
    ))
}

#[derive(Deserialize)]
struct LoginInput {
    email: String,
    password: String,
}

async fn login(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Json(input): Json<LoginInput>,
) -> Result<impl IntoResponse, AppError> {
    let user = auth::authenticate_user(&state.db, &input.email, &input.password).await?;
    let session_id = auth::create_session(&state.db, user.id).await?;
    Ok((
        auth::apply_session_cookie(jar, &session_id),
        Json(json!({ "user": UserProfile::from(&user) })),
    ))
}

async fn logout(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
) -> Result<impl IntoResponse, AppError> {
    if let Some(cookie) = jar.get(auth::SESSION_COOKIE) {
        auth::destroy_session(&state.db, cookie.value()).await?;
    }
    Ok((
        auth::clear_session_cookie(jar),
        Json(json!({ "message": "successfully logged out" })),
    ))
}

async fn me(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<UserProfile>, AppError> {
    let user = current.require_user()?;
    let user = User::find_by_id(&state.db, user.id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(UserProfile::from(&user)))
}

async fn profile(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<UserProfile>, AppError> {
    me(State(state), current).await
}

async fn update_profile(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<UserProfile>, AppError> {
    let user = current.require_user()?;
    let user = User::update_profile(&state.db, user.id, &update).await?;
    Ok(Json(UserProfile::from(&user)))
}

#[derive(Deserialize)]
struct PreferencesUpdate {
    preferences: Map<String, Value>,
}

async fn update_preferences(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(update): Json<PreferencesUpdate>,
) -> Result<Json<Value>, AppError> {
    let user = current.require_user()?;
    let merged = User::merge_preferences(&state.db, user.id, update.preferences).await?;
    Ok(Json(json!({ "preferences": merged })))
}
