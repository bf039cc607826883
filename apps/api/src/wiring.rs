use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use appointment_cell::{
    AppointmentState, AppointmentStore, MedicalCheckStore, MemoryAppointmentStore,
    MemoryMedicalCheckStore, SupabaseAppointmentStore, SupabaseMedicalCheckStore,
};
use auth_cell::{MemoryOtpStore, OtpService, OtpStore, RedisOtpStore};
use doctor_cell::{
    DoctorProfileStore, DoctorService, MemoryDoctorProfileStore, SupabaseDoctorProfileStore,
};
use notification_cell::{ChannelNotifier, DispatcherConfig, NotificationDispatcher, Notifier};
use shared_config::{AppConfig, StorageBackend};
use shared_database::supabase::SupabaseClient;
use shared_database::users::{MemoryUserDirectory, SupabaseUserDirectory, UserDirectory};

/// Fully wired services handed to the cell routers.
pub struct Services {
    pub otp: Arc<OtpService>,
    pub doctors: Arc<DoctorService>,
    pub appointments: AppointmentState,
}

struct Stores {
    users: Arc<dyn UserDirectory>,
    profiles: Arc<dyn DoctorProfileStore>,
    appointments: Arc<dyn AppointmentStore>,
    checks: Arc<dyn MedicalCheckStore>,
}

fn stores(config: &AppConfig) -> Stores {
    match config.storage_backend {
        StorageBackend::Supabase => {
            info!("Using Supabase storage at {}", config.supabase_url);
            let supabase = Arc::new(SupabaseClient::new(config));
            Stores {
                users: Arc::new(SupabaseUserDirectory::new(supabase.clone())),
                profiles: Arc::new(SupabaseDoctorProfileStore::new(supabase.clone())),
                appointments: Arc::new(SupabaseAppointmentStore::new(supabase.clone())),
                checks: Arc::new(SupabaseMedicalCheckStore::new(supabase)),
            }
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage; data is lost on restart");
            Stores {
                users: Arc::new(MemoryUserDirectory::new()),
                profiles: Arc::new(MemoryDoctorProfileStore::new()),
                appointments: Arc::new(MemoryAppointmentStore::new()),
                checks: Arc::new(MemoryMedicalCheckStore::new()),
            }
        }
    }
}

async fn otp_store(config: &AppConfig) -> anyhow::Result<Arc<dyn OtpStore>> {
    match config.redis_url.as_deref() {
        Some(url) => Ok(Arc::new(RedisOtpStore::connect(url).await?)),
        None => {
            warn!("REDIS_URL not set - OTP codes are kept in process memory");
            Ok(Arc::new(MemoryOtpStore::new()))
        }
    }
}

pub async fn build(config: Arc<AppConfig>) -> anyhow::Result<(Services, Vec<JoinHandle<()>>)> {
    let stores = stores(&config);

    let transport: Arc<dyn Notifier> = Arc::new(ChannelNotifier::from_config(&config));
    let (dispatcher, workers) =
        NotificationDispatcher::start(DispatcherConfig::from(config.as_ref()), transport.clone());

    let otp = Arc::new(OtpService::new(
        otp_store(&config).await?,
        stores.users.clone(),
        transport,
        config.clone(),
    ));
    let doctors = Arc::new(DoctorService::new(stores.profiles.clone(), stores.users.clone()));
    let appointments = AppointmentState::new(
        stores.appointments,
        stores.checks,
        stores.profiles,
        stores.users,
        dispatcher,
    );

    Ok((
        Services {
            otp,
            doctors,
            appointments,
        },
        workers,
    ))
}
