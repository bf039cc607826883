pub mod appointment;
pub mod earnings;
pub mod lifecycle;
pub mod medical_check;
pub mod store;
pub mod summary_pdf;

pub use appointment::AppointmentService;
pub use earnings::EarningsService;
pub use lifecycle::{available_actions, valid_transitions, validate_action, LifecycleAction};
pub use medical_check::{
    MedicalCheckService, MedicalCheckStore, MemoryMedicalCheckStore, SupabaseMedicalCheckStore,
};
pub use store::{AppointmentStore, MemoryAppointmentStore, SupabaseAppointmentStore};
pub use summary_pdf::SummaryDocument;
