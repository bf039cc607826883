#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use uuid::Uuid;

use appointment_cell::{
    Appointment, AppointmentMode, AppointmentState, AppointmentStatus, AppointmentStore,
    MemoryAppointmentStore, MemoryMedicalCheckStore,
};
use doctor_cell::{DoctorProfile, MemoryDoctorProfileStore};
use notification_cell::test_utils::RecordingNotifier;
use notification_cell::{DispatcherConfig, NotificationDispatcher, NotificationMessage, Notifier};
use shared_database::users::MemoryUserDirectory;
use shared_models::auth::Role;
use shared_models::user::UserAccount;

pub struct Clinic {
    pub state: AppointmentState,
    pub store: Arc<MemoryAppointmentStore>,
    pub profiles: Arc<MemoryDoctorProfileStore>,
    pub users: Arc<MemoryUserDirectory>,
    pub recorder: Arc<RecordingNotifier>,
    pub doctor: UserAccount,
    pub profile: DoctorProfile,
    pub patient: UserAccount,
}

impl Clinic {
    pub async fn new() -> Self {
        let (clinic, _handles) = Self::with_transport(
            None,
            DispatcherConfig {
                worker_count: 1,
                queue_capacity: 32,
            },
        )
        .await;
        clinic
    }

    /// Builds the clinic around a caller-chosen transport. `None` uses the recorder.
    pub async fn with_transport(
        notifier: Option<Arc<dyn Notifier>>,
        dispatch: DispatcherConfig,
    ) -> (Self, Vec<JoinHandle<()>>) {
        let store = Arc::new(MemoryAppointmentStore::new());
        let checks = Arc::new(MemoryMedicalCheckStore::new());
        let profiles = Arc::new(MemoryDoctorProfileStore::new());
        let users = Arc::new(MemoryUserDirectory::new());
        let recorder = Arc::new(RecordingNotifier::new());

        let doctor = UserAccount::new("Dr. Mehta", "mehta@example.com", "+15550101", Role::Doctor);
        let patient = UserAccount::new("Asha Rao", "asha@example.com", "+15550100", Role::Patient);
        let profile = DoctorProfile::new(doctor.id, "Cardiology", "LIC-001", 500.0);

        users.insert(doctor.clone()).await;
        users.insert(patient.clone()).await;
        profiles.insert(profile.clone()).await;

        let notifier = notifier.unwrap_or_else(|| recorder.clone() as Arc<dyn Notifier>);
        let (dispatcher, handles) = NotificationDispatcher::start(dispatch, notifier);

        let state = AppointmentState::new(
            store.clone(),
            checks,
            profiles.clone(),
            users.clone(),
            dispatcher,
        );

        let clinic = Self {
            state,
            store,
            profiles,
            users,
            recorder,
            doctor,
            profile,
            patient,
        };
        (clinic, handles)
    }

    /// Inserts an appointment directly, bypassing booking validation.
    pub async fn seed(&self, status: AppointmentStatus, scheduled_at: DateTime<Utc>) -> Appointment {
        let mut appointment = Appointment::new(
            self.patient.id,
            self.profile.id,
            scheduled_at,
            AppointmentMode::Online,
        );
        appointment.status = status;
        self.store.create(&appointment).await.unwrap()
    }

    pub async fn stored(&self, id: Uuid) -> Appointment {
        self.store.get_by_id(id).await.unwrap()
    }

    pub async fn sent(&self, count: usize) -> Vec<NotificationMessage> {
        self.recorder.wait_for(count, Duration::from_secs(2)).await
    }
}

pub fn in_days(days: i64) -> DateTime<Utc> {
    Utc::now() + chrono::Duration::days(days)
}
