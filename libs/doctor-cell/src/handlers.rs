use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::{Role, User};
use shared_models::error::AppError;
use shared_utils::extractor::{actor_id, require_role, JsonBody};

use crate::models::{UpdateAvailabilityRequest, UpdateFeeRequest};
use crate::services::DoctorService;

fn doctor(user: &User) -> Result<Uuid, AppError> {
    require_role(user, Role::Doctor)?;
    actor_id(user)
}

#[axum::debug_handler]
pub async fn get_own_profile(
    State(service): State<Arc<DoctorService>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let profile = service.get_own_profile(doctor(&user)?).await?;

    Ok(Json(json!({
        "success": true,
        "profile": profile
    })))
}

#[axum::debug_handler]
pub async fn update_fee(
    State(service): State<Arc<DoctorService>>,
    Extension(user): Extension<User>,
    JsonBody(request): JsonBody<UpdateFeeRequest>,
) -> Result<Json<Value>, AppError> {
    let profile = service
        .update_fee(doctor(&user)?, request.consultation_fees)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Consultation fee updated",
        "consultation_fees": profile.consultation_fees
    })))
}

#[axum::debug_handler]
pub async fn update_availability(
    State(service): State<Arc<DoctorService>>,
    Extension(user): Extension<User>,
    JsonBody(request): JsonBody<UpdateAvailabilityRequest>,
) -> Result<Json<Value>, AppError> {
    let profile = service
        .update_availability(doctor(&user)?, request.availability_slots)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Availability updated",
        "availability_slots": profile.availability_slots
    })))
}

#[axum::debug_handler]
pub async fn approve_doctor(
    State(service): State<Arc<DoctorService>>,
    Extension(user): Extension<User>,
    Path(doctor_user_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, Role::Admin)?;
    let profile = service
        .approve_doctor(actor_id(&user)?, doctor_user_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Doctor approved",
        "profile": profile
    })))
}
