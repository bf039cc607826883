use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::OtpService;

pub fn auth_routes(config: Arc<AppConfig>, service: Arc<OtpService>) -> Router {
    let public_routes = Router::new()
        .route("/otp/phone/send", post(handlers::send_phone_otp))
        .route("/otp/phone/verify", post(handlers::verify_phone_otp))
        .route("/otp/email/send", post(handlers::send_email_otp))
        .route("/otp/email/verify", post(handlers::verify_email_otp));

    let protected_routes = Router::new()
        .route("/validate", get(handlers::validate_token))
        .layer(middleware::from_fn_with_state(config, auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(service)
}
