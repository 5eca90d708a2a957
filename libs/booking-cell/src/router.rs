use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn booking_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", post(handlers::create_appointment))
        .route("/availability/check", get(handlers::check_availability))
        .route("/clients/{client_id}", get(handlers::list_client_appointments))
        .route("/lawyers/{lawyer_id}", get(handlers::list_lawyer_appointments))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}/status", post(handlers::change_status))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
