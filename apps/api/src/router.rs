use std::sync::Arc;

use axum::{routing::get, Router};

use appointment_cell::router::{appointment_routes, medical_check_routes};
use auth_cell::router::auth_routes;
use doctor_cell::router::doctor_routes;
use shared_config::AppConfig;

use crate::wiring::Services;

pub fn create_router(config: Arc<AppConfig>, services: Services) -> Router {
    Router::new()
        .route("/", get(|| async { "Wello API is running!" }))
        .nest("/auth", auth_routes(config.clone(), services.otp))
        .nest("/doctors", doctor_routes(config.clone(), services.doctors))
        .nest(
            "/appointments",
            appointment_routes(config.clone(), services.appointments.clone()),
        )
        .nest(
            "/medical-checks",
            medical_check_routes(config, services.appointments),
        )
}
