use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod auth;
pub mod config;
pub mod database;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod providers;
pub mod queue;
pub mod services;
pub mod storage;
pub mod worker;

use handlers::AppState;

pub fn create_app(state: AppState) -> Router {
    let max_upload = state.config.max_upload_size;

    Router::new()
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/refresh", post(handlers::auth::refresh))
        .route("/api/auth/me", get(handlers::auth::me))
        .route(
            "/api/assets",
            post(handlers::assets::upload).get(handlers::assets::list),
        )
        .route(
            "/api/assets/:id",
            get(handlers::assets::get).delete(handlers::assets::delete),
        )
        .route("/api/assets/:id/download", get(handlers::assets::download))
        .route(
            "/api/jobs",
            post(handlers::jobs::create).get(handlers::jobs::list),
        )
        .route("/api/jobs/:id", get(handlers::jobs::get))
        .route("/health/live", get(handlers::health::liveness))
        .route("/health/ready", get(handlers::health::readiness))
        .route("/health/providers", get(handlers::health::providers))
        .route("/metrics", get(handlers::metrics::render))
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
