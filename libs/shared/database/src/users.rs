use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_models::user::UserAccount;

use crate::error::StoreError;
use crate::supabase::SupabaseClient;

/// Read access to registered accounts, plus the approval flag written by admins.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> Result<UserAccount, StoreError>;
    async fn find_by_phone(&self, phone: &str) -> Result<Option<UserAccount>, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, StoreError>;
    async fn set_approved(&self, id: Uuid, approved: bool) -> Result<(), StoreError>;
}

pub struct SupabaseUserDirectory {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseUserDirectory {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    async fn find_one(&self, query: String) -> Result<Option<UserAccount>, StoreError> {
        let rows: Vec<UserAccount> = self.supabase.select("users", &query).await?;
        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl UserDirectory for SupabaseUserDirectory {
    async fn get_by_id(&self, id: Uuid) -> Result<UserAccount, StoreError> {
        self.find_one(format!("id=eq.{}", id))
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn find_by_phone(&self, phone: &str) -> Result<Option<UserAccount>, StoreError> {
        self.find_one(format!("phone=eq.{}", urlencoding::encode(phone))).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, StoreError> {
        self.find_one(format!("email=eq.{}", urlencoding::encode(email))).await
    }

    async fn set_approved(&self, id: Uuid, approved: bool) -> Result<(), StoreError> {
        debug!("Setting approval of user {} to {}", id, approved);
        let updated: Vec<UserAccount> = self
            .supabase
            .update(
                "users",
                &format!("id=eq.{}", id),
                json!({ "is_approved": approved, "updated_at": Utc::now() }),
            )
            .await?;

        if updated.is_empty() {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

/// Process-local directory used when no database is configured and in tests.
#[derive(Default)]
pub struct MemoryUserDirectory {
    users: RwLock<HashMap<Uuid, UserAccount>>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, user: UserAccount) {
        self.users.write().await.insert(user.id, user);
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn get_by_id(&self, id: Uuid) -> Result<UserAccount, StoreError> {
        self.users
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn find_by_phone(&self, phone: &str) -> Result<Option<UserAccount>, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.phone == phone)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn set_approved(&self, id: Uuid, approved: bool) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.is_approved = approved;
        user.updated_at = Utc::now();
        Ok(())
    }
}
