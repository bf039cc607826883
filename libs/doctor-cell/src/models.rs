use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_database::StoreError;
use shared_models::error::AppError;

/// Time slots offered on one weekday, e.g. `{"day": "Monday", "slots": ["09:00-12:00"]}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AvailabilitySlot {
    pub day: String,
    pub slots: Vec<String>,
}

impl AvailabilitySlot {
    pub fn weekday(&self) -> Option<Weekday> {
        self.day.trim().parse().ok()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DoctorProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub specialization: String,
    pub license_number: String,
    pub consultation_fees: f64,
    #[serde(default)]
    pub availability_slots: Vec<AvailabilitySlot>,
    pub photo_url: Option<String>,
    #[serde(default)]
    pub clinic_name: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub experience: String,
    #[serde(default)]
    pub certifications: String,
    pub is_pending: bool,
    pub approved_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DoctorProfile {
    /// A pending profile with no availability, as created at doctor sign-up.
    pub fn new(user_id: Uuid, specialization: &str, license_number: &str, consultation_fees: f64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            specialization: specialization.to_string(),
            license_number: license_number.to_string(),
            consultation_fees,
            availability_slots: Vec::new(),
            photo_url: None,
            clinic_name: String::new(),
            bio: String::new(),
            experience: String::new(),
            certifications: String::new(),
            is_pending: true,
            approved_by: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateFeeRequest {
    pub consultation_fees: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateAvailabilityRequest {
    pub availability_slots: Vec<AvailabilitySlot>,
}

#[derive(Error, Debug)]
pub enum DoctorError {
    #[error("Doctor profile not found")]
    ProfileNotFound,

    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for DoctorError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => DoctorError::ProfileNotFound,
            other => DoctorError::Store(other),
        }
    }
}

impl From<DoctorError> for AppError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::ProfileNotFound => AppError::NotFound(err.to_string()),
            DoctorError::InvalidInput(msg) => AppError::BadRequest(msg),
            DoctorError::Store(StoreError::StaleState) => {
                AppError::Conflict("Doctor profile was modified concurrently".to_string())
            }
            DoctorError::Store(e) => AppError::Database(e.to_string()),
        }
    }
}
