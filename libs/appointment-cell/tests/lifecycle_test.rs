mod common;

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use appointment_cell::{
    Appointment, AppointmentDecision, AppointmentError, AppointmentFilter, AppointmentMode,
    AppointmentService, AppointmentStatus, AppointmentStore, BookAppointmentRequest,
    MemoryAppointmentStore,
};
use common::{in_days, Clinic};
use notification_cell::test_utils::{FailingNotifier, RecordingNotifier};
use notification_cell::{
    DispatcherConfig, NotificationDispatcher, NotificationError, NotificationMessage, Notifier,
};
use shared_database::StoreError;

fn booking(clinic: &Clinic, days: i64) -> BookAppointmentRequest {
    BookAppointmentRequest {
        doctor_profile_id: clinic.profile.id,
        scheduled_at: in_days(days),
        mode: AppointmentMode::Offline,
        location: Some("  Clinic 4B ".to_string()),
        meeting_link: None,
        fee_paid: false,
    }
}

#[tokio::test]
async fn test_book_accept_complete_and_summarize() {
    let clinic = Clinic::new().await;
    let engine = &clinic.state.appointments;

    let booked = engine.book(clinic.patient.id, booking(&clinic, 3)).await.unwrap();
    assert_eq!(booked.status, AppointmentStatus::Pending);
    assert_eq!(booked.location.as_deref(), Some("Clinic 4B"));

    let early = engine
        .add_summary(clinic.doctor.id, booked.id, "Follow-up in 2 weeks")
        .await;
    assert_matches!(early, Err(AppointmentError::InvalidState(_)));

    let accepted = engine
        .respond(clinic.doctor.id, booked.id, AppointmentDecision::Accepted)
        .await
        .unwrap();
    assert_eq!(accepted.status, AppointmentStatus::Accepted);

    let completed = engine.complete(clinic.doctor.id, booked.id).await.unwrap();
    assert_eq!(completed.status, AppointmentStatus::Completed);

    let summarized = engine
        .add_summary(clinic.doctor.id, booked.id, "Follow-up in 2 weeks")
        .await
        .unwrap();
    assert_eq!(summarized.summary.as_deref(), Some("Follow-up in 2 weeks"));
    assert_eq!(summarized.status, AppointmentStatus::Completed);
    assert!(summarized.completion_fields_consistent());
}

#[tokio::test]
async fn test_booking_in_the_past_or_with_unknown_doctor_fails() {
    let clinic = Clinic::new().await;
    let engine = &clinic.state.appointments;

    let past = engine.book(clinic.patient.id, booking(&clinic, -1)).await;
    assert_matches!(past, Err(AppointmentError::InvalidInput(_)));

    let mut unknown = booking(&clinic, 2);
    unknown.doctor_profile_id = Uuid::new_v4();
    let result = engine.book(clinic.patient.id, unknown).await;
    assert_matches!(result, Err(AppointmentError::NotFoundOrForbidden("Doctor profile")));
}

#[tokio::test]
async fn test_complete_refused_outside_accepted_states() {
    let clinic = Clinic::new().await;

    for status in [
        AppointmentStatus::Pending,
        AppointmentStatus::Rejected,
        AppointmentStatus::RescheduleRequested,
        AppointmentStatus::RescheduleRejected,
        AppointmentStatus::CancelledByPatient,
        AppointmentStatus::Completed,
    ] {
        let appointment = clinic.seed(status, in_days(1)).await;
        let result = clinic
            .state
            .appointments
            .complete(clinic.doctor.id, appointment.id)
            .await;

        assert_matches!(result, Err(AppointmentError::InvalidState(_)));
        assert_eq!(clinic.stored(appointment.id).await.status, status);
    }
}

#[tokio::test]
async fn test_cancel_of_past_appointment_is_refused() {
    let clinic = Clinic::new().await;
    let appointment = clinic.seed(AppointmentStatus::Accepted, in_days(-1)).await;

    let result = clinic
        .state
        .appointments
        .cancel(clinic.patient.id, appointment.id)
        .await;

    assert_matches!(result, Err(AppointmentError::PastSchedule));
    assert_eq!(clinic.stored(appointment.id).await.status, AppointmentStatus::Accepted);
}

#[tokio::test]
async fn test_cancel_notifies_doctor() {
    let clinic = Clinic::new().await;
    let appointment = clinic.seed(AppointmentStatus::RescheduledConfirmed, in_days(2)).await;

    let cancelled = clinic
        .state
        .appointments
        .cancel(clinic.patient.id, appointment.id)
        .await
        .unwrap();
    assert_eq!(cancelled.status, AppointmentStatus::CancelledByPatient);

    let sent = clinic.sent(2).await;
    assert!(sent.iter().any(|m| matches!(
        m,
        NotificationMessage::Email { to, subject, body }
            if to == "mehta@example.com"
                && subject == "Appointment Cancelled"
                && body.ends_with("has been cancelled by the patient.")
    )));
    assert!(sent.iter().any(|m| matches!(
        m,
        NotificationMessage::Sms { to, .. } if to == "+15550101"
    )));
}

#[tokio::test]
async fn test_cancel_refused_for_terminal_status() {
    let clinic = Clinic::new().await;
    let appointment = clinic.seed(AppointmentStatus::Rejected, in_days(2)).await;

    let result = clinic
        .state
        .appointments
        .cancel(clinic.patient.id, appointment.id)
        .await;

    assert_matches!(result, Err(AppointmentError::InvalidState(_)));
}

#[tokio::test]
async fn test_reschedule_from_any_status_overwrites_time() {
    let clinic = Clinic::new().await;
    let proposed = in_days(10);

    for status in [AppointmentStatus::Pending, AppointmentStatus::Rejected, AppointmentStatus::RescheduleRequested] {
        let appointment = clinic.seed(status, in_days(1)).await;
        let rescheduled = clinic
            .state
            .appointments
            .request_reschedule(clinic.doctor.id, appointment.id, proposed)
            .await
            .unwrap();

        assert_eq!(rescheduled.status, AppointmentStatus::RescheduleRequested);
        assert_eq!(rescheduled.scheduled_at, proposed);
    }

    let sent = clinic.sent(6).await;
    assert!(sent.iter().any(|m| matches!(
        m,
        NotificationMessage::Email { to, subject, body }
            if to == "asha@example.com"
                && subject == "Reschedule Request from Doctor"
                && body.starts_with("Your appointment has been rescheduled to: ")
    )));
}

#[tokio::test]
async fn test_rescheduling_completed_appointment_clears_review_fields() {
    let clinic = Clinic::new().await;
    let mut appointment = clinic.seed(AppointmentStatus::Completed, in_days(-2)).await;
    appointment.summary = Some("All good".to_string());
    appointment.rating = Some(4);
    clinic.store.save(&appointment).await.unwrap();

    let rescheduled = clinic
        .state
        .appointments
        .request_reschedule(clinic.doctor.id, appointment.id, in_days(5))
        .await
        .unwrap();

    assert!(rescheduled.summary.is_none());
    assert!(rescheduled.rating.is_none());
    assert!(rescheduled.completion_fields_consistent());
}

#[tokio::test]
async fn test_rejecting_reschedule_notifies_and_blocks_second_response() {
    let clinic = Clinic::new().await;
    let appointment = clinic.seed(AppointmentStatus::RescheduleRequested, in_days(4)).await;
    let engine = &clinic.state.appointments;

    let rejected = engine
        .respond_reschedule(clinic.patient.id, appointment.id, false)
        .await
        .unwrap();
    assert_eq!(rejected.status, AppointmentStatus::RescheduleRejected);
    assert_eq!(rejected.scheduled_at, appointment.scheduled_at);

    let sent = clinic.sent(2).await;
    assert!(sent.contains(&NotificationMessage::Email {
        to: "mehta@example.com".to_string(),
        subject: "Patient Response to Reschedule".to_string(),
        body: "The patient has rejected your reschedule request.".to_string(),
    }));

    let again = engine
        .respond_reschedule(clinic.patient.id, appointment.id, true)
        .await;
    assert_matches!(again, Err(AppointmentError::InvalidState(_)));
}

#[tokio::test]
async fn test_accepting_reschedule_confirms() {
    let clinic = Clinic::new().await;
    let appointment = clinic.seed(AppointmentStatus::RescheduleRequested, in_days(4)).await;

    let confirmed = clinic
        .state
        .appointments
        .respond_reschedule(clinic.patient.id, appointment.id, true)
        .await
        .unwrap();

    assert_eq!(confirmed.status, AppointmentStatus::RescheduledConfirmed);
}

#[tokio::test]
async fn test_review_rating_out_of_range_always_fails() {
    let clinic = Clinic::new().await;
    let engine = &clinic.state.appointments;
    let completed = clinic.seed(AppointmentStatus::Completed, in_days(-1)).await;
    let pending = clinic.seed(AppointmentStatus::Pending, in_days(1)).await;

    for rating in [0, 6, -3] {
        for id in [completed.id, pending.id, Uuid::new_v4()] {
            let result = engine.submit_review(clinic.patient.id, id, rating, None).await;
            assert_matches!(result, Err(AppointmentError::InvalidInput(_)));
        }
    }

    let not_done = engine.submit_review(clinic.patient.id, pending.id, 5, None).await;
    assert_matches!(not_done, Err(AppointmentError::InvalidState(_)));

    let reviewed = engine
        .submit_review(clinic.patient.id, completed.id, 5, Some("Very thorough".to_string()))
        .await
        .unwrap();
    assert_eq!(reviewed.rating, Some(5));
    assert_eq!(reviewed.review.as_deref(), Some("Very thorough"));
}

#[tokio::test]
async fn test_foreign_actor_sees_not_found() {
    let clinic = Clinic::new().await;
    let appointment = clinic.seed(AppointmentStatus::Pending, in_days(2)).await;
    let engine = &clinic.state.appointments;

    let stranger = Uuid::new_v4();
    assert_matches!(
        engine.cancel(stranger, appointment.id).await,
        Err(AppointmentError::NotFoundOrForbidden("Appointment"))
    );
    assert_matches!(
        engine.cancel(clinic.patient.id, Uuid::new_v4()).await,
        Err(AppointmentError::NotFoundOrForbidden("Appointment"))
    );

    // A second doctor with their own profile cannot touch the first doctor's appointment.
    let other = doctor_cell::DoctorProfile::new(Uuid::new_v4(), "ENT", "LIC-002", 100.0);
    clinic.profiles.insert(other.clone()).await;
    assert_matches!(
        engine
            .respond(other.user_id, appointment.id, AppointmentDecision::Accepted)
            .await,
        Err(AppointmentError::NotFoundOrForbidden("Appointment"))
    );
    assert_eq!(clinic.stored(appointment.id).await.status, AppointmentStatus::Pending);

    assert!(engine.get_for_actor(clinic.doctor.id, appointment.id).await.is_ok());
    assert!(engine.get_for_actor(clinic.patient.id, appointment.id).await.is_ok());
    assert_matches!(
        engine.get_for_actor(other.user_id, appointment.id).await,
        Err(AppointmentError::NotFoundOrForbidden(_))
    );
}

#[tokio::test]
async fn test_respond_only_from_pending() {
    let clinic = Clinic::new().await;
    let appointment = clinic.seed(AppointmentStatus::Pending, in_days(2)).await;
    let engine = &clinic.state.appointments;

    let rejected = engine
        .respond(clinic.doctor.id, appointment.id, AppointmentDecision::Rejected)
        .await
        .unwrap();
    assert_eq!(rejected.status, AppointmentStatus::Rejected);

    let again = engine
        .respond(clinic.doctor.id, appointment.id, AppointmentDecision::Accepted)
        .await;
    assert_matches!(again, Err(AppointmentError::InvalidState(_)));
}

#[tokio::test]
async fn test_transitions_without_counterparty_side_effects_send_nothing() {
    let clinic = Clinic::new().await;
    let appointment = clinic.seed(AppointmentStatus::Pending, in_days(2)).await;
    let engine = &clinic.state.appointments;

    engine
        .respond(clinic.doctor.id, appointment.id, AppointmentDecision::Accepted)
        .await
        .unwrap();
    engine.complete(clinic.doctor.id, appointment.id).await.unwrap();

    let sent = clinic.recorder.wait_for(1, Duration::from_millis(100)).await;
    assert!(sent.is_empty());
}

#[tokio::test]
async fn test_reschedule_to_past_time_is_rejected() {
    let clinic = Clinic::new().await;
    let appointment = clinic.seed(AppointmentStatus::Accepted, in_days(2)).await;

    let result = clinic
        .state
        .appointments
        .request_reschedule(clinic.doctor.id, appointment.id, in_days(-1))
        .await;

    assert_matches!(result, Err(AppointmentError::InvalidInput(_)));
    let stored = clinic.stored(appointment.id).await;
    assert_eq!(stored.status, AppointmentStatus::Accepted);
    assert_eq!(stored.scheduled_at, appointment.scheduled_at);
}

/// Runs cancel, reschedule and reschedule response against `clinic`, all of which notify.
async fn run_notifying_transitions(clinic: &Clinic) {
    let engine = &clinic.state.appointments;

    let to_cancel = clinic.seed(AppointmentStatus::Accepted, in_days(3)).await;
    let cancelled = engine.cancel(clinic.patient.id, to_cancel.id).await.unwrap();
    assert_eq!(cancelled.status, AppointmentStatus::CancelledByPatient);

    let to_move = clinic.seed(AppointmentStatus::Pending, in_days(2)).await;
    let requested = engine
        .request_reschedule(clinic.doctor.id, to_move.id, in_days(6))
        .await
        .unwrap();
    assert_eq!(requested.status, AppointmentStatus::RescheduleRequested);

    let answered = engine
        .respond_reschedule(clinic.patient.id, to_move.id, false)
        .await
        .unwrap();
    assert_eq!(answered.status, AppointmentStatus::RescheduleRejected);

    assert_eq!(
        clinic.stored(to_cancel.id).await.status,
        AppointmentStatus::CancelledByPatient
    );
    assert_eq!(
        clinic.stored(to_move.id).await.status,
        AppointmentStatus::RescheduleRejected
    );
}

#[tokio::test]
async fn test_transitions_succeed_when_delivery_fails() {
    let config = DispatcherConfig {
        worker_count: 1,
        queue_capacity: 32,
    };
    let (clinic, _handles) = Clinic::with_transport(Some(Arc::new(FailingNotifier)), config).await;

    run_notifying_transitions(&clinic).await;
}

/// Transport that never finishes a delivery, so the first job pins the only worker.
struct StalledNotifier;

#[async_trait]
impl Notifier for StalledNotifier {
    async fn send_email(&self, _to: &str, _subject: &str, _body: &str) -> Result<(), NotificationError> {
        std::future::pending().await
    }

    async fn send_sms(&self, _to: &str, _body: &str) -> Result<(), NotificationError> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn test_transitions_succeed_when_queue_is_full() {
    let config = DispatcherConfig {
        worker_count: 1,
        queue_capacity: 1,
    };
    let (clinic, _handles) = Clinic::with_transport(Some(Arc::new(StalledNotifier)), config).await;

    run_notifying_transitions(&clinic).await;
}

#[tokio::test]
async fn test_transitions_succeed_when_queue_is_closed() {
    let config = DispatcherConfig {
        worker_count: 1,
        queue_capacity: 4,
    };
    let (clinic, handles) = Clinic::with_transport(None, config).await;
    for handle in handles {
        handle.abort();
        let _ = handle.await;
    }

    run_notifying_transitions(&clinic).await;
    assert!(clinic.recorder.messages().await.is_empty());
}

/// Store that lets a competing writer change the status right after each read.
struct RacingStore {
    inner: Arc<MemoryAppointmentStore>,
    competing_status: Mutex<Option<AppointmentStatus>>,
}

#[async_trait]
impl AppointmentStore for RacingStore {
    async fn create(&self, appointment: &Appointment) -> Result<Appointment, StoreError> {
        self.inner.create(appointment).await
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Appointment, StoreError> {
        let read = self.inner.get_by_id(id).await?;
        if let Some(status) = self.competing_status.lock().await.take() {
            let mut competing = read.clone();
            competing.status = status;
            self.inner.save(&competing).await?;
        }
        Ok(read)
    }

    async fn find_by_doctor_profile(
        &self,
        doctor_profile_id: Uuid,
        filter: &AppointmentFilter,
    ) -> Result<Vec<Appointment>, StoreError> {
        self.inner.find_by_doctor_profile(doctor_profile_id, filter).await
    }

    async fn find_by_patient(
        &self,
        patient_id: Uuid,
        filter: &AppointmentFilter,
    ) -> Result<Vec<Appointment>, StoreError> {
        self.inner.find_by_patient(patient_id, filter).await
    }

    async fn save(&self, appointment: &Appointment) -> Result<Appointment, StoreError> {
        self.inner.save(appointment).await
    }

    async fn save_if_status(
        &self,
        appointment: &Appointment,
        expected: AppointmentStatus,
    ) -> Result<Appointment, StoreError> {
        self.inner.save_if_status(appointment, expected).await
    }
}

#[tokio::test]
async fn test_concurrent_status_change_fails_transition_without_writing() {
    let clinic = Clinic::new().await;
    let appointment = clinic.seed(AppointmentStatus::Pending, in_days(2)).await;

    let racing = Arc::new(RacingStore {
        inner: clinic.store.clone(),
        competing_status: Mutex::new(Some(AppointmentStatus::CancelledByPatient)),
    });
    let (dispatcher, _handles) = NotificationDispatcher::start(
        DispatcherConfig {
            worker_count: 1,
            queue_capacity: 8,
        },
        Arc::new(RecordingNotifier::new()),
    );
    let engine = AppointmentService::new(
        racing,
        clinic.profiles.clone(),
        clinic.users.clone(),
        dispatcher,
    );

    let result = engine
        .respond(clinic.doctor.id, appointment.id, AppointmentDecision::Accepted)
        .await;

    assert_matches!(result, Err(AppointmentError::InvalidState(_)));
    let stored = clinic.stored(appointment.id).await;
    assert_eq!(stored.status, AppointmentStatus::CancelledByPatient);
    assert_eq!(stored.scheduled_at, appointment.scheduled_at);
}
