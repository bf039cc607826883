use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use doctor_cell::DoctorProfileStore;
use shared_database::supabase::SupabaseClient;
use shared_database::StoreError;

use crate::models::{
    AppointmentError, AppointmentFilter, CreateMedicalCheckRequest, MedicalCheck, SortOrder,
    TestStatus,
};
use crate::services::store::AppointmentStore;

const TABLE: &str = "medical_checks";

#[async_trait]
pub trait MedicalCheckStore: Send + Sync {
    async fn create(&self, check: &MedicalCheck) -> Result<MedicalCheck, StoreError>;
    async fn get_by_id(&self, id: Uuid) -> Result<MedicalCheck, StoreError>;
    async fn find_by_appointment(&self, appointment_id: Uuid) -> Result<Option<MedicalCheck>, StoreError>;
    /// Checks of any of the given appointments, newest first.
    async fn find_by_appointments(&self, appointment_ids: &[Uuid]) -> Result<Vec<MedicalCheck>, StoreError>;
    async fn save(&self, check: &MedicalCheck) -> Result<MedicalCheck, StoreError>;
}

pub struct SupabaseMedicalCheckStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseMedicalCheckStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

#[async_trait]
impl MedicalCheckStore for SupabaseMedicalCheckStore {
    async fn create(&self, check: &MedicalCheck) -> Result<MedicalCheck, StoreError> {
        let rows: Vec<MedicalCheck> = self
            .supabase
            .insert(TABLE, serde_json::to_value(check)?)
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::Backend("Insert returned no row".to_string()))
    }

    async fn get_by_id(&self, id: Uuid) -> Result<MedicalCheck, StoreError> {
        let rows: Vec<MedicalCheck> = self.supabase.select(TABLE, &format!("id=eq.{}", id)).await?;
        rows.into_iter().next().ok_or(StoreError::NotFound)
    }

    async fn find_by_appointment(&self, appointment_id: Uuid) -> Result<Option<MedicalCheck>, StoreError> {
        let rows: Vec<MedicalCheck> = self
            .supabase
            .select(TABLE, &format!("appointment_id=eq.{}", appointment_id))
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn find_by_appointments(&self, appointment_ids: &[Uuid]) -> Result<Vec<MedicalCheck>, StoreError> {
        if appointment_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids = appointment_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let query = format!("appointment_id=in.({})&order=created_at.desc", ids);
        Ok(self.supabase.select(TABLE, &query).await?)
    }

    async fn save(&self, check: &MedicalCheck) -> Result<MedicalCheck, StoreError> {
        let rows: Vec<MedicalCheck> = self
            .supabase
            .update(TABLE, &format!("id=eq.{}", check.id), serde_json::to_value(check)?)
            .await?;
        rows.into_iter().next().ok_or(StoreError::NotFound)
    }
}

#[derive(Default)]
pub struct MemoryMedicalCheckStore {
    checks: RwLock<HashMap<Uuid, MedicalCheck>>,
}

impl MemoryMedicalCheckStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MedicalCheckStore for MemoryMedicalCheckStore {
    async fn create(&self, check: &MedicalCheck) -> Result<MedicalCheck, StoreError> {
        let mut checks = self.checks.write().await;
        if checks.values().any(|c| c.appointment_id == check.appointment_id) {
            return Err(StoreError::Backend(format!(
                "Appointment {} already has a medical check",
                check.appointment_id
            )));
        }
        checks.insert(check.id, check.clone());
        Ok(check.clone())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<MedicalCheck, StoreError> {
        self.checks
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn find_by_appointment(&self, appointment_id: Uuid) -> Result<Option<MedicalCheck>, StoreError> {
        Ok(self
            .checks
            .read()
            .await
            .values()
            .find(|c| c.appointment_id == appointment_id)
            .cloned())
    }

    async fn find_by_appointments(&self, appointment_ids: &[Uuid]) -> Result<Vec<MedicalCheck>, StoreError> {
        let mut found: Vec<MedicalCheck> = self
            .checks
            .read()
            .await
            .values()
            .filter(|c| appointment_ids.contains(&c.appointment_id))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn save(&self, check: &MedicalCheck) -> Result<MedicalCheck, StoreError> {
        let mut checks = self.checks.write().await;
        let stored = checks.get_mut(&check.id).ok_or(StoreError::NotFound)?;
        *stored = check.clone();
        Ok(stored.clone())
    }
}

/// Lab test requests attached to appointments. Only the doctor who owns the appointment
/// may create or update its check.
pub struct MedicalCheckService {
    checks: Arc<dyn MedicalCheckStore>,
    appointments: Arc<dyn AppointmentStore>,
    profiles: Arc<dyn DoctorProfileStore>,
}

impl MedicalCheckService {
    pub fn new(
        checks: Arc<dyn MedicalCheckStore>,
        appointments: Arc<dyn AppointmentStore>,
        profiles: Arc<dyn DoctorProfileStore>,
    ) -> Self {
        Self {
            checks,
            appointments,
            profiles,
        }
    }

    pub async fn create(
        &self,
        doctor_user_id: Uuid,
        request: CreateMedicalCheckRequest,
    ) -> Result<MedicalCheck, AppointmentError> {
        let location = request.location.trim();
        if location.is_empty() {
            return Err(AppointmentError::InvalidInput(
                "Test location is required".to_string(),
            ));
        }

        self.ensure_owns_appointment(doctor_user_id, request.appointment_id)
            .await?;

        if self
            .checks
            .find_by_appointment(request.appointment_id)
            .await?
            .is_some()
        {
            return Err(AppointmentError::InvalidState(
                "A test has already been requested for this appointment".to_string(),
            ));
        }

        let check = MedicalCheck::new(request.appointment_id, request.test_type, location);
        let created = self.checks.create(&check).await?;
        info!(
            "Medical check {} requested for appointment {}",
            created.id, created.appointment_id
        );
        Ok(created)
    }

    pub async fn schedule(
        &self,
        doctor_user_id: Uuid,
        check_id: Uuid,
        team_assigned: &str,
    ) -> Result<MedicalCheck, AppointmentError> {
        let team = team_assigned.trim();
        if team.is_empty() {
            return Err(AppointmentError::InvalidInput(
                "Assigned team is required".to_string(),
            ));
        }

        let mut check = self.load_for_doctor(doctor_user_id, check_id).await?;
        require_status(&check, TestStatus::Pending, "Only pending tests can be scheduled")?;

        check.team_assigned = Some(team.to_string());
        check.status = TestStatus::Scheduled;
        self.persist(check).await
    }

    pub async fn complete(
        &self,
        doctor_user_id: Uuid,
        check_id: Uuid,
    ) -> Result<MedicalCheck, AppointmentError> {
        let mut check = self.load_for_doctor(doctor_user_id, check_id).await?;
        require_status(&check, TestStatus::Scheduled, "Only scheduled tests can be completed")?;

        check.status = TestStatus::Completed;
        self.persist(check).await
    }

    pub async fn upload_report(
        &self,
        doctor_user_id: Uuid,
        check_id: Uuid,
        report_url: &str,
    ) -> Result<MedicalCheck, AppointmentError> {
        let report_url = report_url.trim();
        if report_url.is_empty() {
            return Err(AppointmentError::InvalidInput(
                "Invalid or missing report URL".to_string(),
            ));
        }

        let mut check = self.load_for_doctor(doctor_user_id, check_id).await?;
        check.report_url = Some(report_url.to_string());
        check.report_uploaded = true;
        check.status = TestStatus::Reported;
        self.persist(check).await
    }

    /// Every check requested on the patient's appointments, newest first.
    pub async fn patient_history(&self, patient_id: Uuid) -> Result<Vec<MedicalCheck>, AppointmentError> {
        let appointments = self
            .appointments
            .find_by_patient(patient_id, &AppointmentFilter::ordered(SortOrder::Descending))
            .await?;
        let ids: Vec<Uuid> = appointments.iter().map(|a| a.id).collect();

        debug!("Loading tests for {} appointments of patient {}", ids.len(), patient_id);
        Ok(self.checks.find_by_appointments(&ids).await?)
    }

    async fn ensure_owns_appointment(
        &self,
        doctor_user_id: Uuid,
        appointment_id: Uuid,
    ) -> Result<(), AppointmentError> {
        let profile = self
            .profiles
            .get_by_user_id(doctor_user_id)
            .await
            .map_err(|e| match e {
                StoreError::NotFound => AppointmentError::NotFoundOrForbidden("Doctor profile"),
                other => other.into(),
            })?;

        let appointment = self.appointments.get_by_id(appointment_id).await?;
        if appointment.doctor_profile_id != profile.id {
            return Err(AppointmentError::NotFoundOrForbidden("Appointment"));
        }
        Ok(())
    }

    async fn load_for_doctor(
        &self,
        doctor_user_id: Uuid,
        check_id: Uuid,
    ) -> Result<MedicalCheck, AppointmentError> {
        let check = self.checks.get_by_id(check_id).await.map_err(|e| match e {
            StoreError::NotFound => AppointmentError::NotFoundOrForbidden("Medical check"),
            other => other.into(),
        })?;

        self.ensure_owns_appointment(doctor_user_id, check.appointment_id)
            .await
            .map_err(|e| match e {
                AppointmentError::NotFoundOrForbidden(_) => {
                    AppointmentError::NotFoundOrForbidden("Medical check")
                }
                other => other,
            })?;

        Ok(check)
    }

    async fn persist(&self, mut check: MedicalCheck) -> Result<MedicalCheck, AppointmentError> {
        check.updated_at = Utc::now();
        let saved = self.checks.save(&check).await?;
        info!("Medical check {} is now {:?}", saved.id, saved.status);
        Ok(saved)
    }
}

fn require_status(
    check: &MedicalCheck,
    expected: TestStatus,
    refusal: &str,
) -> Result<(), AppointmentError> {
    if check.status != expected {
        warn!("Refused update of medical check {} in status {:?}", check.id, check.status);
        return Err(AppointmentError::InvalidState(refusal.to_string()));
    }
    Ok(())
}
