use axum::{
    extract::{Extension, Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::{Role, User};
use shared_models::error::AppError;
use shared_utils::extractor::{actor_id, require_role, JsonBody};

use crate::models::{
    AddSummaryRequest, BookAppointmentRequest, CreateMedicalCheckRequest, EarningsPeriod,
    RescheduleAppointmentRequest, RespondAppointmentRequest, RespondRescheduleRequest,
    ScheduleMedicalCheckRequest, SubmitReviewRequest, UploadReportRequest,
};
use crate::services::lifecycle::{available_actions, valid_transitions};
use crate::services::summary_pdf::SummaryDocument;
use crate::state::AppointmentState;

#[derive(Debug, Deserialize)]
pub struct EarningsQuery {
    pub period: Option<String>,
}

fn doctor(user: &User) -> Result<Uuid, AppError> {
    require_role(user, Role::Doctor)?;
    actor_id(user)
}

fn patient(user: &User) -> Result<Uuid, AppError> {
    require_role(user, Role::Patient)?;
    actor_id(user)
}

// ==============================================================================
// LIFECYCLE
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
    JsonBody(request): JsonBody<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let patient_id = patient(&user)?;
    let appointment = state.appointments.book(patient_id, request).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment booked successfully",
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = state
        .appointments
        .get_for_actor(actor_id(&user)?, appointment_id)
        .await?;
    let allowed_transitions = valid_transitions(appointment.status);
    let actions = available_actions(appointment.status, user.role);

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "allowed_transitions": allowed_transitions,
        "available_actions": actions
    })))
}

#[axum::debug_handler]
pub async fn respond_to_appointment(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    JsonBody(request): JsonBody<RespondAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = state
        .appointments
        .respond(doctor(&user)?, appointment_id, request.decision)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Appointment status updated to {}", appointment.status),
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    JsonBody(request): JsonBody<RescheduleAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = state
        .appointments
        .request_reschedule(doctor(&user)?, appointment_id, request.new_date)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment reschedule request sent to patient",
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn respond_to_reschedule(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    JsonBody(request): JsonBody<RespondRescheduleRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = state
        .appointments
        .respond_reschedule(patient(&user)?, appointment_id, request.accept)
        .await?;

    let message = if request.accept {
        "Reschedule accepted"
    } else {
        "Reschedule rejected"
    };

    Ok(Json(json!({
        "success": true,
        "message": message,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = state
        .appointments
        .complete(doctor(&user)?, appointment_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment marked as completed",
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn add_summary(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    JsonBody(request): JsonBody<AddSummaryRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = state
        .appointments
        .add_summary(doctor(&user)?, appointment_id, &request.summary)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Summary added successfully",
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn download_summary_pdf(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let document = state
        .appointments
        .summary_document(doctor(&user)?, appointment_id)
        .await?;
    let bytes = document.render()?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", SummaryDocument::FILENAME),
            ),
        ],
        bytes,
    )
        .into_response())
}

#[axum::debug_handler]
pub async fn submit_review(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    JsonBody(request): JsonBody<SubmitReviewRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = state
        .appointments
        .submit_review(patient(&user)?, appointment_id, request.rating, request.review)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Review submitted successfully",
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = state
        .appointments
        .cancel(patient(&user)?, appointment_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment cancelled successfully",
        "appointment": appointment
    })))
}

// ==============================================================================
// DOCTOR VIEWS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_doctor_appointments(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let appointments = state.appointments.doctor_appointments(doctor(&user)?).await?;

    Ok(Json(json!({
        "success": true,
        "total": appointments.len(),
        "appointments": appointments
    })))
}

#[axum::debug_handler]
pub async fn get_reschedule_requests(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let requests = state
        .appointments
        .doctor_reschedule_requests(doctor(&user)?)
        .await?;

    Ok(Json(json!({
        "success": true,
        "reschedule_requests": requests
    })))
}

#[axum::debug_handler]
pub async fn get_doctor_upcoming(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let appointments = state.appointments.doctor_upcoming(doctor(&user)?).await?;

    Ok(Json(json!({
        "success": true,
        "upcoming_appointments": appointments
    })))
}

#[axum::debug_handler]
pub async fn get_doctor_patients(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let patients = state.appointments.doctor_patients(doctor(&user)?).await?;

    Ok(Json(json!({
        "success": true,
        "patients": patients
    })))
}

#[axum::debug_handler]
pub async fn get_patient_history_for_doctor(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let history = state
        .appointments
        .doctor_patient_history(doctor(&user)?, patient_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "patient_history": history
    })))
}

#[axum::debug_handler]
pub async fn get_doctor_reviews(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let reviews = state.appointments.doctor_reviews(doctor(&user)?).await?;

    Ok(Json(json!({
        "success": true,
        "reviews": reviews
    })))
}

#[axum::debug_handler]
pub async fn get_doctor_earnings(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
    Query(query): Query<EarningsQuery>,
) -> Result<Json<Value>, AppError> {
    let doctor_user_id = doctor(&user)?;
    let period: EarningsPeriod = query.period.as_deref().unwrap_or("all").parse()?;
    let report = state.earnings.doctor_earnings(doctor_user_id, period).await?;

    Ok(Json(json!({
        "success": true,
        "earnings": report
    })))
}

// ==============================================================================
// PATIENT VIEWS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_patient_upcoming(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let appointments = state.appointments.patient_upcoming(patient(&user)?).await?;

    Ok(Json(json!({
        "success": true,
        "upcoming_appointments": appointments
    })))
}

#[axum::debug_handler]
pub async fn get_patient_history(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let history = state.appointments.patient_history(patient(&user)?).await?;

    Ok(Json(json!({
        "success": true,
        "history": history
    })))
}

#[axum::debug_handler]
pub async fn get_patient_appointments(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let appointments = state.appointments.patient_appointments(patient(&user)?).await?;

    Ok(Json(json!({
        "success": true,
        "total": appointments.len(),
        "appointments": appointments
    })))
}

// ==============================================================================
// MEDICAL CHECKS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_medical_check(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
    JsonBody(request): JsonBody<CreateMedicalCheckRequest>,
) -> Result<Json<Value>, AppError> {
    let check = state.medical_checks.create(doctor(&user)?, request).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Test request created successfully",
        "test": check
    })))
}

#[axum::debug_handler]
pub async fn schedule_medical_check(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
    Path(check_id): Path<Uuid>,
    JsonBody(request): JsonBody<ScheduleMedicalCheckRequest>,
) -> Result<Json<Value>, AppError> {
    let check = state
        .medical_checks
        .schedule(doctor(&user)?, check_id, &request.team_assigned)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Test scheduled",
        "test": check
    })))
}

#[axum::debug_handler]
pub async fn complete_medical_check(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
    Path(check_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let check = state
        .medical_checks
        .complete(doctor(&user)?, check_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Test marked as completed",
        "test": check
    })))
}

#[axum::debug_handler]
pub async fn upload_test_report(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
    Path(check_id): Path<Uuid>,
    JsonBody(request): JsonBody<UploadReportRequest>,
) -> Result<Json<Value>, AppError> {
    let check = state
        .medical_checks
        .upload_report(doctor(&user)?, check_id, &request.report_url)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Report URL saved successfully",
        "test": check
    })))
}

#[axum::debug_handler]
pub async fn get_patient_test_history(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let tests = state.medical_checks.patient_history(patient(&user)?).await?;

    Ok(Json(json!({
        "success": true,
        "tests": tests
    })))
}
