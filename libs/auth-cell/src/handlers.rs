use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    Json,
};
use serde_json::{json, Value};
use tracing::debug;

use shared_models::auth::{TokenResponse, User};
use shared_models::error::AppError;
use shared_utils::extractor::JsonBody;

use crate::models::{
    OtpVerification, SendEmailOtpRequest, SendPhoneOtpRequest, VerifyEmailOtpRequest,
    VerifyPhoneOtpRequest,
};
use crate::services::OtpService;

fn verified(verification: OtpVerification) -> Json<Value> {
    Json(json!({
        "success": true,
        "message": "OTP verified successfully",
        "token": verification.token,
        "new_user": verification.new_user,
        "user": verification.user
    }))
}

#[axum::debug_handler]
pub async fn send_phone_otp(
    State(service): State<Arc<OtpService>>,
    JsonBody(request): JsonBody<SendPhoneOtpRequest>,
) -> Result<Json<Value>, AppError> {
    service.send_phone_otp(&request.phone).await?;

    Ok(Json(json!({
        "success": true,
        "message": "OTP sent successfully"
    })))
}

#[axum::debug_handler]
pub async fn verify_phone_otp(
    State(service): State<Arc<OtpService>>,
    JsonBody(request): JsonBody<VerifyPhoneOtpRequest>,
) -> Result<Json<Value>, AppError> {
    let verification = service.verify_phone_otp(&request.phone, &request.otp).await?;
    Ok(verified(verification))
}

#[axum::debug_handler]
pub async fn send_email_otp(
    State(service): State<Arc<OtpService>>,
    JsonBody(request): JsonBody<SendEmailOtpRequest>,
) -> Result<Json<Value>, AppError> {
    service.send_email_otp(&request.email).await?;

    Ok(Json(json!({
        "success": true,
        "message": "OTP sent successfully"
    })))
}

#[axum::debug_handler]
pub async fn verify_email_otp(
    State(service): State<Arc<OtpService>>,
    JsonBody(request): JsonBody<VerifyEmailOtpRequest>,
) -> Result<Json<Value>, AppError> {
    let verification = service.verify_email_otp(&request.email, &request.otp).await?;
    Ok(verified(verification))
}

/// Echoes the identity carried by a token that passed the auth middleware.
pub async fn validate_token(Extension(user): Extension<User>) -> Json<TokenResponse> {
    debug!("Token validated for {}", user.id);

    Json(TokenResponse {
        valid: true,
        user_id: user.id,
        role: user.role,
    })
}
