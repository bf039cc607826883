use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use doctor_cell::{DoctorProfile, DoctorProfileStore};
use notification_cell::NotificationDispatcher;
use shared_database::users::UserDirectory;
use shared_database::StoreError;
use shared_models::user::UserAccount;

use crate::models::{
    Appointment, AppointmentDecision, AppointmentError, AppointmentFilter, AppointmentStatus,
    BookAppointmentRequest, ReviewEntry, SortOrder,
};
use crate::services::lifecycle::{validate_action, LifecycleAction};
use crate::services::store::AppointmentStore;
use crate::services::summary_pdf::SummaryDocument;

const NOTIFICATION_TIME_FORMAT: &str = "%b %-d, %Y %-I:%M %p";

fn format_schedule(at: DateTime<Utc>) -> String {
    at.format(NOTIFICATION_TIME_FORMAT).to_string()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Appointment lifecycle engine. Every transition loads the appointment, checks that the
/// actor owns the relevant side and that the current status permits the action, then
/// writes conditionally on the status it read. Counterparties are notified through the
/// dispatcher after the write; notification problems never fail the transition.
pub struct AppointmentService {
    store: Arc<dyn AppointmentStore>,
    profiles: Arc<dyn DoctorProfileStore>,
    users: Arc<dyn UserDirectory>,
    notifier: NotificationDispatcher,
}

impl AppointmentService {
    pub fn new(
        store: Arc<dyn AppointmentStore>,
        profiles: Arc<dyn DoctorProfileStore>,
        users: Arc<dyn UserDirectory>,
        notifier: NotificationDispatcher,
    ) -> Self {
        Self {
            store,
            profiles,
            users,
            notifier,
        }
    }

    // ==========================================================================
    // TRANSITIONS
    // ==========================================================================

    pub async fn book(
        &self,
        patient_id: Uuid,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        if request.scheduled_at <= Utc::now() {
            return Err(AppointmentError::InvalidInput(
                "Appointment must be scheduled in the future".to_string(),
            ));
        }

        self.profiles
            .get_by_id(request.doctor_profile_id)
            .await
            .map_err(profile_error)?;

        let mut appointment = Appointment::new(
            patient_id,
            request.doctor_profile_id,
            request.scheduled_at,
            request.mode,
        );
        appointment.location = non_blank(request.location);
        appointment.meeting_link = non_blank(request.meeting_link);
        appointment.fee_paid = request.fee_paid;

        let created = self.store.create(&appointment).await?;
        info!(
            "Appointment {} booked by patient {} with doctor profile {}",
            created.id, patient_id, created.doctor_profile_id
        );
        Ok(created)
    }

    pub async fn respond(
        &self,
        doctor_user_id: Uuid,
        appointment_id: Uuid,
        decision: AppointmentDecision,
    ) -> Result<Appointment, AppointmentError> {
        let (mut appointment, _) = self.load_for_doctor(doctor_user_id, appointment_id).await?;
        let previous = appointment.status;
        validate_action(LifecycleAction::Respond, previous)?;

        appointment.status = decision.status();
        self.commit(appointment, previous).await
    }

    /// Moves the appointment to the proposed time immediately and asks the patient to
    /// confirm it.
    pub async fn request_reschedule(
        &self,
        doctor_user_id: Uuid,
        appointment_id: Uuid,
        new_date: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        if new_date <= Utc::now() {
            return Err(AppointmentError::InvalidInput(
                "New appointment time must be in the future".to_string(),
            ));
        }

        let (mut appointment, _) = self.load_for_doctor(doctor_user_id, appointment_id).await?;
        let previous = appointment.status;
        validate_action(LifecycleAction::RequestReschedule, previous)?;

        if appointment.summary.is_some() || appointment.rating.is_some() {
            warn!(
                "Rescheduling completed appointment {} discards its summary and review",
                appointment.id
            );
        }
        appointment.summary = None;
        appointment.rating = None;
        appointment.review = None;
        appointment.scheduled_at = new_date;
        appointment.status = AppointmentStatus::RescheduleRequested;

        let saved = self.commit(appointment, previous).await?;

        let when = format_schedule(new_date);
        if let Some(patient) = self.contact(saved.patient_id).await {
            self.notifier.notify_email(
                &patient.email,
                "Reschedule Request from Doctor",
                &format!("Your appointment has been rescheduled to: {}", when),
            );
            self.notifier.notify_sms(
                &patient.phone,
                &format!("Your appointment has been rescheduled to: {}", when),
            );
        }

        Ok(saved)
    }

    pub async fn respond_reschedule(
        &self,
        patient_id: Uuid,
        appointment_id: Uuid,
        accept: bool,
    ) -> Result<Appointment, AppointmentError> {
        let mut appointment = self.load_for_patient(patient_id, appointment_id).await?;
        let previous = appointment.status;
        validate_action(LifecycleAction::RespondReschedule, previous)?;

        // A rejected request keeps the proposed time; the original slot is not restored.
        appointment.status = if accept {
            AppointmentStatus::RescheduledConfirmed
        } else {
            AppointmentStatus::RescheduleRejected
        };

        let saved = self.commit(appointment, previous).await?;

        let verdict = if accept { "accepted" } else { "rejected" };
        if let Some(doctor) = self.doctor_contact(saved.doctor_profile_id).await {
            self.notifier.notify_email(
                &doctor.email,
                "Patient Response to Reschedule",
                &format!("The patient has {} your reschedule request.", verdict),
            );
            self.notifier.notify_sms(
                &doctor.phone,
                &format!("Patient {} your reschedule request.", verdict),
            );
        }

        Ok(saved)
    }

    pub async fn complete(
        &self,
        doctor_user_id: Uuid,
        appointment_id: Uuid,
    ) -> Result<Appointment, AppointmentError> {
        let (mut appointment, _) = self.load_for_doctor(doctor_user_id, appointment_id).await?;
        let previous = appointment.status;
        validate_action(LifecycleAction::Complete, previous)?;

        appointment.status = AppointmentStatus::Completed;
        self.commit(appointment, previous).await
    }

    pub async fn add_summary(
        &self,
        doctor_user_id: Uuid,
        appointment_id: Uuid,
        summary: &str,
    ) -> Result<Appointment, AppointmentError> {
        let summary = summary.trim();
        if summary.is_empty() {
            return Err(AppointmentError::InvalidInput(
                "Invalid or empty summary".to_string(),
            ));
        }

        let (mut appointment, _) = self.load_for_doctor(doctor_user_id, appointment_id).await?;
        let previous = appointment.status;
        validate_action(LifecycleAction::AddSummary, previous)?;

        appointment.summary = Some(summary.to_string());
        self.commit(appointment, previous).await
    }

    pub async fn submit_review(
        &self,
        patient_id: Uuid,
        appointment_id: Uuid,
        rating: i32,
        review: Option<String>,
    ) -> Result<Appointment, AppointmentError> {
        if !(1..=5).contains(&rating) {
            return Err(AppointmentError::InvalidInput(
                "Rating must be between 1 and 5".to_string(),
            ));
        }

        let mut appointment = self.load_for_patient(patient_id, appointment_id).await?;
        let previous = appointment.status;
        validate_action(LifecycleAction::SubmitReview, previous)?;

        appointment.rating = Some(rating);
        appointment.review = non_blank(review);
        self.commit(appointment, previous).await
    }

    pub async fn cancel(
        &self,
        patient_id: Uuid,
        appointment_id: Uuid,
    ) -> Result<Appointment, AppointmentError> {
        let mut appointment = self.load_for_patient(patient_id, appointment_id).await?;
        let previous = appointment.status;
        validate_action(LifecycleAction::Cancel, previous)?;

        if appointment.scheduled_at < Utc::now() {
            warn!("Refused cancellation of past appointment {}", appointment.id);
            return Err(AppointmentError::PastSchedule);
        }

        appointment.status = AppointmentStatus::CancelledByPatient;
        let saved = self.commit(appointment, previous).await?;

        let when = format_schedule(saved.scheduled_at);
        if let Some(doctor) = self.doctor_contact(saved.doctor_profile_id).await {
            self.notifier.notify_email(
                &doctor.email,
                "Appointment Cancelled",
                &format!(
                    "Your appointment with the patient on {} has been cancelled by the patient.",
                    when
                ),
            );
            self.notifier.notify_sms(
                &doctor.phone,
                &format!("Patient cancelled the appointment scheduled for {}.", when),
            );
        }

        Ok(saved)
    }

    // ==========================================================================
    // READS
    // ==========================================================================

    /// The appointment if the actor is its patient or its doctor.
    pub async fn get_for_actor(
        &self,
        actor_id: Uuid,
        appointment_id: Uuid,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.load(appointment_id).await?;
        if appointment.patient_id == actor_id {
            return Ok(appointment);
        }

        match self.profiles.get_by_user_id(actor_id).await {
            Ok(profile) if profile.id == appointment.doctor_profile_id => Ok(appointment),
            Ok(_) | Err(StoreError::NotFound) => {
                Err(AppointmentError::NotFoundOrForbidden("Appointment"))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// The doctor's summary of one of their appointments, ready to render.
    pub async fn summary_document(
        &self,
        doctor_user_id: Uuid,
        appointment_id: Uuid,
    ) -> Result<SummaryDocument, AppointmentError> {
        let (appointment, profile) = self.load_for_doctor(doctor_user_id, appointment_id).await?;
        let summary = appointment
            .summary
            .ok_or(AppointmentError::NotFoundOrForbidden("Summary"))?;

        let patient_name = match self.contact(appointment.patient_id).await {
            Some(patient) => patient.name,
            None => "Unknown patient".to_string(),
        };
        let doctor = match profile.clinic_name.trim() {
            "" => profile.specialization,
            clinic => format!("{} - {}", clinic, profile.specialization),
        };

        Ok(SummaryDocument {
            patient_name,
            doctor,
            scheduled_for: format_schedule(appointment.scheduled_at),
            summary,
        })
    }

    pub async fn doctor_appointments(
        &self,
        doctor_user_id: Uuid,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        self.for_doctor(doctor_user_id, AppointmentFilter::ordered(SortOrder::Ascending))
            .await
    }

    pub async fn doctor_reschedule_requests(
        &self,
        doctor_user_id: Uuid,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let filter = AppointmentFilter::ordered(SortOrder::Ascending)
            .with_statuses(&[AppointmentStatus::RescheduleRequested]);
        self.for_doctor(doctor_user_id, filter).await
    }

    pub async fn doctor_upcoming(
        &self,
        doctor_user_id: Uuid,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let filter = AppointmentFilter::ordered(SortOrder::Ascending)
            .with_statuses(&[
                AppointmentStatus::Accepted,
                AppointmentStatus::RescheduledConfirmed,
            ])
            .scheduled_after(Utc::now());
        self.for_doctor(doctor_user_id, filter).await
    }

    /// Completed appointments of one patient with this doctor, newest first.
    pub async fn doctor_patient_history(
        &self,
        doctor_user_id: Uuid,
        patient_id: Uuid,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let filter = AppointmentFilter::ordered(SortOrder::Descending)
            .with_statuses(&[AppointmentStatus::Completed])
            .for_patient(patient_id);
        self.for_doctor(doctor_user_id, filter).await
    }

    /// Distinct patients with at least one completed appointment with this doctor.
    pub async fn doctor_patients(
        &self,
        doctor_user_id: Uuid,
    ) -> Result<Vec<UserAccount>, AppointmentError> {
        let filter = AppointmentFilter::ordered(SortOrder::Ascending)
            .with_statuses(&[AppointmentStatus::Completed]);
        let completed = self.for_doctor(doctor_user_id, filter).await?;

        let mut seen = HashSet::new();
        let mut patients = Vec::new();
        for patient_id in completed.iter().map(|a| a.patient_id) {
            if !seen.insert(patient_id) {
                continue;
            }
            match self.users.get_by_id(patient_id).await {
                Ok(user) => patients.push(user),
                Err(StoreError::NotFound) => {
                    warn!("Appointment references unknown patient {}", patient_id)
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(patients)
    }

    pub async fn doctor_reviews(
        &self,
        doctor_user_id: Uuid,
    ) -> Result<Vec<ReviewEntry>, AppointmentError> {
        let filter = AppointmentFilter::ordered(SortOrder::Descending)
            .with_statuses(&[AppointmentStatus::Completed]);
        let completed = self.for_doctor(doctor_user_id, filter).await?;

        Ok(completed
            .into_iter()
            .filter_map(|a| {
                a.rating.map(|rating| ReviewEntry {
                    appointment_id: a.id,
                    patient_id: a.patient_id,
                    rating,
                    review: a.review,
                    scheduled_at: a.scheduled_at,
                })
            })
            .collect())
    }

    pub async fn patient_upcoming(
        &self,
        patient_id: Uuid,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let filter = AppointmentFilter::ordered(SortOrder::Ascending)
            .with_statuses(&[
                AppointmentStatus::Pending,
                AppointmentStatus::Accepted,
                AppointmentStatus::RescheduledConfirmed,
            ])
            .scheduled_after(Utc::now());
        Ok(self.store.find_by_patient(patient_id, &filter).await?)
    }

    pub async fn patient_history(
        &self,
        patient_id: Uuid,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let filter = AppointmentFilter::ordered(SortOrder::Descending)
            .with_statuses(&[AppointmentStatus::Completed]);
        Ok(self.store.find_by_patient(patient_id, &filter).await?)
    }

    pub async fn patient_appointments(
        &self,
        patient_id: Uuid,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let filter = AppointmentFilter::ordered(SortOrder::Descending);
        Ok(self.store.find_by_patient(patient_id, &filter).await?)
    }

    // ==========================================================================
    // HELPERS
    // ==========================================================================

    async fn load(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.store.get_by_id(appointment_id).await.map_err(Into::into)
    }

    async fn own_profile(&self, doctor_user_id: Uuid) -> Result<DoctorProfile, AppointmentError> {
        self.profiles
            .get_by_user_id(doctor_user_id)
            .await
            .map_err(profile_error)
    }

    async fn load_for_doctor(
        &self,
        doctor_user_id: Uuid,
        appointment_id: Uuid,
    ) -> Result<(Appointment, DoctorProfile), AppointmentError> {
        let profile = self.own_profile(doctor_user_id).await?;
        let appointment = self.load(appointment_id).await?;

        if appointment.doctor_profile_id != profile.id {
            debug!(
                "Doctor {} does not own appointment {}",
                doctor_user_id, appointment_id
            );
            return Err(AppointmentError::NotFoundOrForbidden("Appointment"));
        }

        Ok((appointment, profile))
    }

    async fn load_for_patient(
        &self,
        patient_id: Uuid,
        appointment_id: Uuid,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.load(appointment_id).await?;

        if appointment.patient_id != patient_id {
            debug!("Patient {} does not own appointment {}", patient_id, appointment_id);
            return Err(AppointmentError::NotFoundOrForbidden("Appointment"));
        }

        Ok(appointment)
    }

    async fn for_doctor(
        &self,
        doctor_user_id: Uuid,
        filter: AppointmentFilter,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let profile = self.own_profile(doctor_user_id).await?;
        Ok(self.store.find_by_doctor_profile(profile.id, &filter).await?)
    }

    async fn commit(
        &self,
        mut appointment: Appointment,
        previous: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError> {
        appointment.updated_at = Utc::now();
        let saved = self.store.save_if_status(&appointment, previous).await?;
        info!(
            "Appointment {} transitioned {} -> {}",
            saved.id, previous, saved.status
        );
        Ok(saved)
    }

    /// Contact details for notifications. Lookup failures are logged and skip the
    /// notification.
    async fn contact(&self, user_id: Uuid) -> Option<UserAccount> {
        match self.users.get_by_id(user_id).await {
            Ok(user) => Some(user),
            Err(e) => {
                warn!("Cannot notify user {}: {}", user_id, e);
                None
            }
        }
    }

    async fn doctor_contact(&self, doctor_profile_id: Uuid) -> Option<UserAccount> {
        match self.profiles.get_by_id(doctor_profile_id).await {
            Ok(profile) => self.contact(profile.user_id).await,
            Err(e) => {
                warn!("Cannot notify doctor profile {}: {}", doctor_profile_id, e);
                None
            }
        }
    }
}

fn profile_error(err: StoreError) -> AppointmentError {
    match err {
        StoreError::NotFound => AppointmentError::NotFoundOrForbidden("Doctor profile"),
        other => other.into(),
    }
}
