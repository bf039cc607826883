use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use shared_database::users::UserDirectory;

use crate::models::{AvailabilitySlot, DoctorError, DoctorProfile};
use crate::services::profile::DoctorProfileStore;

pub struct DoctorService {
    profiles: Arc<dyn DoctorProfileStore>,
    users: Arc<dyn UserDirectory>,
}

impl DoctorService {
    pub fn new(profiles: Arc<dyn DoctorProfileStore>, users: Arc<dyn UserDirectory>) -> Self {
        Self { profiles, users }
    }

    pub async fn get_own_profile(&self, doctor_user_id: Uuid) -> Result<DoctorProfile, DoctorError> {
        Ok(self.profiles.get_by_user_id(doctor_user_id).await?)
    }

    pub async fn update_fee(&self, doctor_user_id: Uuid, fee: f64) -> Result<DoctorProfile, DoctorError> {
        if !fee.is_finite() || fee < 0.0 {
            warn!("Rejected consultation fee {} for doctor {}", fee, doctor_user_id);
            return Err(DoctorError::InvalidInput(
                "Consultation fee must be a non-negative amount".to_string(),
            ));
        }

        let mut profile = self.profiles.get_by_user_id(doctor_user_id).await?;
        profile.consultation_fees = fee;
        profile.updated_at = Utc::now();

        let saved = self.profiles.save(&profile).await?;
        info!("Consultation fee of doctor profile {} set to {}", saved.id, fee);
        Ok(saved)
    }

    pub async fn update_availability(
        &self,
        doctor_user_id: Uuid,
        slots: Vec<AvailabilitySlot>,
    ) -> Result<DoctorProfile, DoctorError> {
        validate_availability(&slots)?;

        let mut profile = self.profiles.get_by_user_id(doctor_user_id).await?;
        profile.availability_slots = slots;
        profile.updated_at = Utc::now();

        let saved = self.profiles.save(&profile).await?;
        info!(
            "Availability of doctor profile {} updated ({} days)",
            saved.id,
            saved.availability_slots.len()
        );
        Ok(saved)
    }

    /// Marks the account approved, then clears the pending flag on the doctor's profile.
    /// A failed account update leaves the profile pending, so a retry is always safe.
    pub async fn approve_doctor(
        &self,
        admin_id: Uuid,
        doctor_user_id: Uuid,
    ) -> Result<DoctorProfile, DoctorError> {
        let mut profile = self.profiles.get_by_user_id(doctor_user_id).await?;
        profile.is_pending = false;
        profile.approved_by = Some(admin_id);
        profile.updated_at = Utc::now();

        self.users.set_approved(doctor_user_id, true).await?;
        let saved = self.profiles.save(&profile).await?;

        info!("Doctor {} approved by admin {}", doctor_user_id, admin_id);
        Ok(saved)
    }
}

fn validate_availability(slots: &[AvailabilitySlot]) -> Result<(), DoctorError> {
    let mut seen = HashSet::new();

    for slot in slots {
        let weekday = slot.weekday().ok_or_else(|| {
            DoctorError::InvalidInput(format!("Unknown day of week: {}", slot.day))
        })?;

        if !seen.insert(weekday) {
            return Err(DoctorError::InvalidInput(format!(
                "Day listed more than once: {}",
                slot.day
            )));
        }

        if slot.slots.iter().any(|s| s.trim().is_empty()) {
            return Err(DoctorError::InvalidInput(format!(
                "Empty time slot on {}",
                slot.day
            )));
        }
    }

    Ok(())
}
