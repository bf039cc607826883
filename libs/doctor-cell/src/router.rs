use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::DoctorService;

pub fn doctor_routes(config: Arc<AppConfig>, service: Arc<DoctorService>) -> Router {
    Router::new()
        // Doctor self-service
        .route("/profile", get(handlers::get_own_profile))
        .route("/fee", put(handlers::update_fee))
        .route("/slots", put(handlers::update_availability))
        // Admin
        .route("/{doctor_user_id}/approve", post(handlers::approve_doctor))
        .layer(middleware::from_fn_with_state(config, auth_middleware))
        .with_state(service)
}
