pub mod doctor;
pub mod profile;

pub use doctor::DoctorService;
pub use profile::{DoctorProfileStore, MemoryDoctorProfileStore, SupabaseDoctorProfileStore};
