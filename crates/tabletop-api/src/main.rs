//! Tabletop session coordinator entry point.

use std::error::Error;
use std::sync::{Arc, Mutex};

use sqlx::postgres::PgPoolOptions;
use tabletop_api::config::Config;
use tabletop_api::error::AppError;
use tabletop_api::narrator::HttpNarrator;
use tabletop_api::state::AppState;
use tabletop_api::telemetry;
use tabletop_core::clock::SystemClock;
use tabletop_core::narration::{DisabledNarrator, Narrator};
use tabletop_core::rng::SystemRng;
use tabletop_state_store::pg_state_store::PgStateStore;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = Config::from_env()?;
    let telemetry = telemetry::init(config.otlp_endpoint.as_deref())?;

    tracing::info!("Starting tabletop session coordinator");

    // Create database connection pool and bring the schema up to date.
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .map_err(AppError::Database)?;
    tabletop_state_store::run_migrations(&pool)
        .await
        .map_err(AppError::Migration)?;

    let narrator: Arc<dyn Narrator> = match &config.narrator_url {
        Some(url) => Arc::new(HttpNarrator::new(url.clone())),
        None => {
            tracing::warn!("NARRATOR_URL not set; prompted narration is disabled");
            Arc::new(DisabledNarrator)
        }
    };

    let app_state = AppState::new(
        Arc::new(SystemClock),
        Arc::new(PgStateStore::new(pool)),
        Arc::new(Mutex::new(SystemRng::new())),
        narrator,
        config.edge_settings(),
    );

    let app = tabletop_api::app(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = config.bind_addr()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(AppError::Server)?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Server)?;

    telemetry.shutdown();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
