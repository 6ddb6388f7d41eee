pub mod application;
pub mod candidate;
pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::AppState;

pub const MAX_BODY_BYTES: usize = 1024 * 1024;

pub fn router(state: AppState, request_timeout: Duration) -> Router {
    let api = Router::new()
        .route("/api/candidates", post(candidate::create_candidate))
        .route("/api/candidates/:id", get(candidate::get_candidate))
        .route(
            "/api/applications",
            get(application::list_applications).post(application::create_application),
        )
        .route("/api/applications/:id", get(application::get_application))
        .route(
            "/api/applications/:id/transition",
            post(application::transition_application),
        );

    Router::new()
        .route("/health", get(health::health))
        .merge(api)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(request_timeout))
                .layer(CorsLayer::permissive()),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}
