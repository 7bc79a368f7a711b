use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use super::{clean, cross, handlers, middleware::metrics_middleware, unregistered, upgrade};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let timeout = Duration::from_secs(state.config().server.request_timeout_secs);

    // Release endpoints
    let release_routes = Router::new()
        .route("/upgrade", post(upgrade::upgrade))
        .route("/clean", post(clean::clean))
        .route("/cross", post(cross::cross))
        .route("/unregistered", post(unregistered::unregistered))
        .with_state(Arc::clone(&state));

    // Health and config
    let v1_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .with_state(state);

    Router::new()
        .nest("/api", release_routes)
        .nest("/api/v1", v1_routes)
        .route("/healthz", get(handlers::healthz))
        .route("/metrics", get(handlers::metrics))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
}
