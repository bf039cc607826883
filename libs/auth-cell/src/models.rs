use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_database::StoreError;
use shared_models::error::AppError;
use shared_models::user::UserAccount;

/// Where a one-time code is delivered. Codes are stored per channel and destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpChannel {
    Phone,
    Email,
}

impl OtpChannel {
    pub fn key(&self, destination: &str) -> String {
        match self {
            OtpChannel::Phone => format!("otp:phone:{}", destination),
            OtpChannel::Email => format!("otp:email:{}", destination.to_ascii_lowercase()),
        }
    }
}

// ==============================================================================
// REQUEST SCHEMAS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct SendPhoneOtpRequest {
    pub phone: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyPhoneOtpRequest {
    pub phone: String,
    pub otp: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendEmailOtpRequest {
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyEmailOtpRequest {
    pub email: String,
    pub otp: String,
}

/// Outcome of a successful verification. `user` is absent for destinations that have
/// no account yet; their token carries `needs_profile`.
#[derive(Debug, Clone, Serialize)]
pub struct OtpVerification {
    pub token: String,
    pub new_user: bool,
    pub user: Option<UserAccount>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Invalid OTP")]
    InvalidCode,

    #[error("OTP expired or not found")]
    CodeExpired,

    #[error("Failed to deliver OTP: {0}")]
    Delivery(String),

    #[error("OTP store error: {0}")]
    OtpStore(String),

    #[error("Failed to issue token: {0}")]
    TokenIssue(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<redis::RedisError> for AuthError {
    fn from(err: redis::RedisError) -> Self {
        AuthError::OtpStore(err.to_string())
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidInput(msg) => AppError::BadRequest(msg),
            AuthError::InvalidCode | AuthError::CodeExpired => AppError::Auth(err.to_string()),
            AuthError::Delivery(_) => AppError::ExternalService(err.to_string()),
            AuthError::OtpStore(_) | AuthError::TokenIssue(_) => AppError::Internal(err.to_string()),
            AuthError::Store(e) => AppError::Database(e.to_string()),
        }
    }
}
