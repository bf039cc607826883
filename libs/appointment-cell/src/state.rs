use std::sync::Arc;

use doctor_cell::DoctorProfileStore;
use notification_cell::NotificationDispatcher;
use shared_database::users::UserDirectory;

use crate::services::{
    AppointmentService, AppointmentStore, EarningsService, MedicalCheckService, MedicalCheckStore,
};

/// Services shared by the appointment and medical-check routers.
#[derive(Clone)]
pub struct AppointmentState {
    pub appointments: Arc<AppointmentService>,
    pub earnings: Arc<EarningsService>,
    pub medical_checks: Arc<MedicalCheckService>,
}

impl AppointmentState {
    pub fn new(
        store: Arc<dyn AppointmentStore>,
        checks: Arc<dyn MedicalCheckStore>,
        profiles: Arc<dyn DoctorProfileStore>,
        users: Arc<dyn UserDirectory>,
        notifier: NotificationDispatcher,
    ) -> Self {
        Self {
            appointments: Arc::new(AppointmentService::new(
                store.clone(),
                profiles.clone(),
                users,
                notifier,
            )),
            earnings: Arc::new(EarningsService::new(store.clone(), profiles.clone())),
            medical_checks: Arc::new(MedicalCheckService::new(checks, store, profiles)),
        }
    }
}
