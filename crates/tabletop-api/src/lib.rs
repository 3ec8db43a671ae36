//! Tabletop session coordinator: HTTP/WebSocket edge.

pub mod auth;
pub mod config;
pub mod error;
pub mod narrator;
pub mod routes;
pub mod state;
pub mod telemetry;

use axum::Router;

use crate::state::AppState;

/// Builds the application router with state applied.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1/sessions", routes::sessions::router())
        .with_state(state)
}
