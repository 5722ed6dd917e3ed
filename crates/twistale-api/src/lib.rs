//! Twistale API: HTTP surface over the game room and accounts contexts.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use axum::Router;

use crate::state::AppState;

/// Builds the full application router without middleware layers.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::blobs::router())
        .nest("/api/v1/auth", routes::auth::router())
        .nest("/api/v1/rooms", routes::rooms::router())
        .with_state(state)
}
