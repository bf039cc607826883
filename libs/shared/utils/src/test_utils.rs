use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use shared_config::{AppConfig, StorageBackend};
use shared_models::auth::{Role, User};

use crate::jwt::issue_token;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_service_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_service_key: "test-service-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_service_key: self.supabase_service_key.clone(),
            jwt_secret: self.jwt_secret.clone(),
            jwt_ttl_hours: 72,
            redis_url: None,
            otp_ttl_seconds: 300,
            email_api_url: String::new(),
            email_api_key: String::new(),
            email_from: String::new(),
            email_from_name: "Wello".to_string(),
            twilio_account_sid: String::new(),
            twilio_auth_token: String::new(),
            twilio_phone_number: String::new(),
            twilio_base_url: "http://localhost:0".to_string(),
            notification_workers: 2,
            notification_queue_capacity: 16,
            storage_backend: StorageBackend::Memory,
            port: 0,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: Uuid,
    pub role: Role,
}

impl TestUser {
    pub fn new(role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
        }
    }

    pub fn doctor() -> Self {
        Self::new(Role::Doctor)
    }

    pub fn patient() -> Self {
        Self::new(Role::Patient)
    }

    pub fn admin() -> Self {
        Self::new(Role::Admin)
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.to_string(),
            role: self.role,
            is_approved: true,
            needs_profile: false,
            issued_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        issue_token(
            &user.id.to_string(),
            user.role,
            true,
            false,
            secret,
            exp_hours.unwrap_or(24),
        )
        .expect("test secret is never empty")
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default().to_app_config();

        assert_eq!(config.supabase_url, "http://localhost:54321");
        assert_eq!(config.storage_backend, StorageBackend::Memory);
        assert!(!config.jwt_secret.is_empty());
    }

    #[test]
    fn test_user_creation() {
        let doctor = TestUser::doctor();
        let user = doctor.to_user();

        assert_eq!(user.id, doctor.id.to_string());
        assert_eq!(user.role, Role::Doctor);
    }

    #[test]
    fn test_jwt_token_creation() {
        let token = JwtTestUtils::create_test_token(&TestUser::patient(), "test-secret", Some(1));
        assert_eq!(token.split('.').count(), 3);
    }
}
