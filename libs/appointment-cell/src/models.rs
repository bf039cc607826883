use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_database::StoreError;
use shared_models::error::AppError;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_profile_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub mode: AppointmentMode,
    pub location: Option<String>,
    pub meeting_link: Option<String>,
    pub status: AppointmentStatus,
    pub summary: Option<String>,
    pub rating: Option<i32>,
    pub review: Option<String>,
    #[serde(default)]
    pub fee_paid: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn new(
        patient_id: Uuid,
        doctor_profile_id: Uuid,
        scheduled_at: DateTime<Utc>,
        mode: AppointmentMode,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            patient_id,
            doctor_profile_id,
            scheduled_at,
            mode,
            location: None,
            meeting_link: None,
            status: AppointmentStatus::Pending,
            summary: None,
            rating: None,
            review: None,
            fee_paid: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Summary, rating and review only exist on completed appointments.
    pub fn completion_fields_consistent(&self) -> bool {
        self.status == AppointmentStatus::Completed
            || (self.summary.is_none() && self.rating.is_none() && self.review.is_none())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Pending,
    Accepted,
    Rejected,
    RescheduleRequested,
    RescheduledConfirmed,
    RescheduleRejected,
    Completed,
    CancelledByPatient,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 8] = [
        AppointmentStatus::Pending,
        AppointmentStatus::Accepted,
        AppointmentStatus::Rejected,
        AppointmentStatus::RescheduleRequested,
        AppointmentStatus::RescheduledConfirmed,
        AppointmentStatus::RescheduleRejected,
        AppointmentStatus::Completed,
        AppointmentStatus::CancelledByPatient,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "PENDING",
            AppointmentStatus::Accepted => "ACCEPTED",
            AppointmentStatus::Rejected => "REJECTED",
            AppointmentStatus::RescheduleRequested => "RESCHEDULE_REQUESTED",
            AppointmentStatus::RescheduledConfirmed => "RESCHEDULED_CONFIRMED",
            AppointmentStatus::RescheduleRejected => "RESCHEDULE_REJECTED",
            AppointmentStatus::Completed => "COMPLETED",
            AppointmentStatus::CancelledByPatient => "CANCELLED_BY_PATIENT",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentMode {
    #[default]
    Online,
    Offline,
}

// ==============================================================================
// REQUEST SCHEMAS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct BookAppointmentRequest {
    pub doctor_profile_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    #[serde(default)]
    pub mode: AppointmentMode,
    pub location: Option<String>,
    pub meeting_link: Option<String>,
    #[serde(default)]
    pub fee_paid: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentDecision {
    Accepted,
    Rejected,
}

impl AppointmentDecision {
    pub fn status(&self) -> AppointmentStatus {
        match self {
            AppointmentDecision::Accepted => AppointmentStatus::Accepted,
            AppointmentDecision::Rejected => AppointmentStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RespondAppointmentRequest {
    pub decision: AppointmentDecision,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub new_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RespondRescheduleRequest {
    pub accept: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddSummaryRequest {
    pub summary: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitReviewRequest {
    pub rating: i32,
    #[serde(default)]
    pub review: Option<String>,
}

// ==============================================================================
// QUERIES
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "asc",
            SortOrder::Descending => "desc",
        }
    }
}

/// Selection applied on top of the doctor or patient scope of a store query.
/// Results are always ordered by scheduled time.
#[derive(Debug, Clone, Default)]
pub struct AppointmentFilter {
    pub statuses: Vec<AppointmentStatus>,
    pub scheduled_after: Option<DateTime<Utc>>,
    pub patient_id: Option<Uuid>,
    pub order: SortOrder,
}

impl AppointmentFilter {
    pub fn ordered(order: SortOrder) -> Self {
        Self {
            order,
            ..Self::default()
        }
    }

    pub fn with_statuses(mut self, statuses: &[AppointmentStatus]) -> Self {
        self.statuses = statuses.to_vec();
        self
    }

    pub fn scheduled_after(mut self, after: DateTime<Utc>) -> Self {
        self.scheduled_after = Some(after);
        self
    }

    pub fn for_patient(mut self, patient_id: Uuid) -> Self {
        self.patient_id = Some(patient_id);
        self
    }

    pub fn matches(&self, appointment: &Appointment) -> bool {
        (self.statuses.is_empty() || self.statuses.contains(&appointment.status))
            && self
                .scheduled_after
                .map_or(true, |after| appointment.scheduled_at > after)
            && self
                .patient_id
                .map_or(true, |patient_id| appointment.patient_id == patient_id)
    }
}

/// A rating left on a completed appointment.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReviewEntry {
    pub appointment_id: Uuid,
    pub patient_id: Uuid,
    pub rating: i32,
    pub review: Option<String>,
    pub scheduled_at: DateTime<Utc>,
}

// ==============================================================================
// EARNINGS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EarningsPeriod {
    Daily,
    Weekly,
    Monthly,
    Yearly,
    #[default]
    All,
}

impl FromStr for EarningsPeriod {
    type Err = AppointmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(EarningsPeriod::Daily),
            "weekly" => Ok(EarningsPeriod::Weekly),
            "monthly" => Ok(EarningsPeriod::Monthly),
            "yearly" => Ok(EarningsPeriod::Yearly),
            "" | "all" => Ok(EarningsPeriod::All),
            other => Err(AppointmentError::InvalidInput(format!(
                "Unknown earnings period: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EarningsBucket {
    pub label: String,
    pub total: f64,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EarningsReport {
    pub total_earnings: f64,
    pub total_appointments: u64,
    pub grouped_data: Vec<EarningsBucket>,
    pub period: EarningsPeriod,
}

// ==============================================================================
// MEDICAL CHECKS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum TestType {
    #[default]
    Blood,
    Urine,
    Xray,
    Ct,
    Other,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum TestStatus {
    Pending,
    Scheduled,
    Completed,
    Reported,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MedicalCheck {
    pub id: Uuid,
    pub appointment_id: Uuid,
    #[serde(rename = "type")]
    pub test_type: TestType,
    pub location: String,
    pub team_assigned: Option<String>,
    pub status: TestStatus,
    #[serde(default)]
    pub report_uploaded: bool,
    pub report_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MedicalCheck {
    pub fn new(appointment_id: Uuid, test_type: TestType, location: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            appointment_id,
            test_type,
            location: location.to_string(),
            team_assigned: None,
            status: TestStatus::Pending,
            report_uploaded: false,
            report_url: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateMedicalCheckRequest {
    pub appointment_id: Uuid,
    #[serde(rename = "type", default)]
    pub test_type: TestType,
    pub location: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleMedicalCheckRequest {
    pub team_assigned: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadReportRequest {
    pub report_url: String,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppointmentError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Absent records and records owned by someone else are reported identically.
    #[error("{0} not found")]
    NotFoundOrForbidden(&'static str),

    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Cannot cancel past appointments")]
    PastSchedule,

    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),
}

impl From<StoreError> for AppointmentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AppointmentError::NotFoundOrForbidden("Appointment"),
            StoreError::StaleState => AppointmentError::InvalidState(
                "Appointment was modified by another request".to_string(),
            ),
            StoreError::Backend(msg) => AppointmentError::PersistenceFailure(msg),
        }
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::Unauthorized(msg) => AppError::Auth(msg),
            AppointmentError::NotFoundOrForbidden(_) => AppError::NotFound(err.to_string()),
            AppointmentError::InvalidState(msg) | AppointmentError::InvalidInput(msg) => {
                AppError::BadRequest(msg)
            }
            AppointmentError::PastSchedule => AppError::BadRequest(err.to_string()),
            AppointmentError::PersistenceFailure(msg) => AppError::Database(msg),
        }
    }
}
