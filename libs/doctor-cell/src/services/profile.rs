use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;
use shared_database::StoreError;

use crate::models::DoctorProfile;

const TABLE: &str = "doctor_profiles";

#[async_trait]
pub trait DoctorProfileStore: Send + Sync {
    async fn get_by_user_id(&self, user_id: Uuid) -> Result<DoctorProfile, StoreError>;
    async fn get_by_id(&self, id: Uuid) -> Result<DoctorProfile, StoreError>;
    /// Overwrites an existing profile. Fails with `NotFound` if the id is unknown.
    async fn save(&self, profile: &DoctorProfile) -> Result<DoctorProfile, StoreError>;
}

pub struct SupabaseDoctorProfileStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseDoctorProfileStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    async fn find_one(&self, query: String) -> Result<DoctorProfile, StoreError> {
        debug!("Fetching doctor profile: {}", query);
        let rows: Vec<DoctorProfile> = self.supabase.select(TABLE, &query).await?;
        rows.into_iter().next().ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl DoctorProfileStore for SupabaseDoctorProfileStore {
    async fn get_by_user_id(&self, user_id: Uuid) -> Result<DoctorProfile, StoreError> {
        self.find_one(format!("user_id=eq.{}", user_id)).await
    }

    async fn get_by_id(&self, id: Uuid) -> Result<DoctorProfile, StoreError> {
        self.find_one(format!("id=eq.{}", id)).await
    }

    async fn save(&self, profile: &DoctorProfile) -> Result<DoctorProfile, StoreError> {
        let patch = serde_json::to_value(profile)?;
        let rows: Vec<DoctorProfile> = self
            .supabase
            .update(TABLE, &format!("id=eq.{}", profile.id), patch)
            .await?;
        rows.into_iter().next().ok_or(StoreError::NotFound)
    }
}

#[derive(Default)]
pub struct MemoryDoctorProfileStore {
    profiles: RwLock<HashMap<Uuid, DoctorProfile>>,
}

impl MemoryDoctorProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, profile: DoctorProfile) {
        self.profiles.write().await.insert(profile.id, profile);
    }
}

#[async_trait]
impl DoctorProfileStore for MemoryDoctorProfileStore {
    async fn get_by_user_id(&self, user_id: Uuid) -> Result<DoctorProfile, StoreError> {
        self.profiles
            .read()
            .await
            .values()
            .find(|p| p.user_id == user_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<DoctorProfile, StoreError> {
        self.profiles
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn save(&self, profile: &DoctorProfile) -> Result<DoctorProfile, StoreError> {
        let mut profiles = self.profiles.write().await;
        let stored = profiles.get_mut(&profile.id).ok_or(StoreError::NotFound)?;
        *stored = profile.clone();
        Ok(stored.clone())
    }
}
