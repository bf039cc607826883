use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::state::AppointmentState;

pub fn appointment_routes(config: Arc<AppConfig>, state: AppointmentState) -> Router {
    Router::new()
        .route("/", post(handlers::book_appointment))
        .route("/{appointment_id}", get(handlers::get_appointment))
        // Doctor actions
        .route("/{appointment_id}/respond", put(handlers::respond_to_appointment))
        .route("/{appointment_id}/reschedule", put(handlers::reschedule_appointment))
        .route("/{appointment_id}/complete", put(handlers::complete_appointment))
        .route("/{appointment_id}/summary", put(handlers::add_summary))
        .route("/{appointment_id}/summary-pdf", get(handlers::download_summary_pdf))
        // Patient actions
        .route(
            "/{appointment_id}/reschedule/respond",
            put(handlers::respond_to_reschedule),
        )
        .route("/{appointment_id}/review", post(handlers::submit_review))
        .route("/{appointment_id}/cancel", put(handlers::cancel_appointment))
        // Doctor views
        .route("/doctor", get(handlers::get_doctor_appointments))
        .route("/doctor/reschedule-requests", get(handlers::get_reschedule_requests))
        .route("/doctor/upcoming", get(handlers::get_doctor_upcoming))
        .route("/doctor/patients", get(handlers::get_doctor_patients))
        .route(
            "/doctor/patients/{patient_id}/history",
            get(handlers::get_patient_history_for_doctor),
        )
        .route("/doctor/reviews", get(handlers::get_doctor_reviews))
        .route("/doctor/earnings", get(handlers::get_doctor_earnings))
        // Patient views
        .route("/patient", get(handlers::get_patient_appointments))
        .route("/patient/upcoming", get(handlers::get_patient_upcoming))
        .route("/patient/history", get(handlers::get_patient_history))
        .layer(middleware::from_fn_with_state(config, auth_middleware))
        .with_state(state)
}

pub fn medical_check_routes(config: Arc<AppConfig>, state: AppointmentState) -> Router {
    Router::new()
        .route("/", post(handlers::create_medical_check))
        .route("/history", get(handlers::get_patient_test_history))
        .route("/{check_id}/schedule", put(handlers::schedule_medical_check))
        .route("/{check_id}/complete", put(handlers::complete_medical_check))
        .route("/{check_id}/report", put(handlers::upload_test_report))
        .layer(middleware::from_fn_with_state(config, auth_middleware))
        .with_state(state)
}
