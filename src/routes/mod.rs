pub mod auth;
pub mod places;
pub mod recommendations;
pub mod routing;
pub mod shares;
pub mod stops;
pub mod trips;
pub mod weather;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/auth", auth::router())
        .nest("/trips", trips::router())
        .nest("/places", places::router())
        .nest("/routes", routing::router())
        .nest("/weather", weather::router())
        .nest("/recommendations", recommendations::router());

    Router::new()
        .nest("/api", api)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
