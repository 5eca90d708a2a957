use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use booking_cell::router::booking_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Mela Legal API is running!" }))
        .nest("/appointments", booking_routes(state.clone()))
}
