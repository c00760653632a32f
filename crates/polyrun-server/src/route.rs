//! Router configuration

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::handler;
use crate::state::AppState;

/// Create the API router with request tracing
pub fn create_router(state: AppState) -> Router {
    let templates = Router::new()
        .route("/languages", get(handler::template_languages))
        .route("/types", get(handler::template_types))
        .route(
            "/template/{language}/{template_type}",
            get(handler::template),
        );

    Router::new()
        .route("/execute", post(handler::execute))
        .route("/languages", get(handler::languages))
        .route("/health", get(handler::health))
        .nest("/templates", templates)
        .layer(DefaultBodyLimit::max(state.body_limit()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
