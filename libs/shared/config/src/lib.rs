use std::env;
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Supabase,
    Memory,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub redis_url: Option<String>,
    pub otp_ttl_seconds: u64,
    pub email_api_url: String,
    pub email_api_key: String,
    pub email_from: String,
    pub email_from_name: String,
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub twilio_phone_number: String,
    pub twilio_base_url: String,
    pub notification_workers: usize,
    pub notification_queue_capacity: usize,
    pub storage_backend: StorageBackend,
    pub port: u16,
}

fn required(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        warn!("{} not set, using empty value", key);
        String::new()
    })
}

fn with_default<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has an invalid value ({}), using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut config = Self {
            supabase_url: required("SUPABASE_URL"),
            supabase_service_key: required("SUPABASE_SERVICE_KEY"),
            jwt_secret: required("JWT_SECRET"),
            jwt_ttl_hours: with_default("JWT_TTL_HOURS", 72),
            redis_url: env::var("REDIS_URL").ok().filter(|url| !url.is_empty()),
            otp_ttl_seconds: with_default("OTP_TTL_SECONDS", 300),
            email_api_url: required("EMAIL_API_URL"),
            email_api_key: required("EMAIL_API_KEY"),
            email_from: required("EMAIL_FROM"),
            email_from_name: env::var("EMAIL_FROM_NAME").unwrap_or_else(|_| "Wello".to_string()),
            twilio_account_sid: required("TWILIO_ACCOUNT_SID"),
            twilio_auth_token: required("TWILIO_AUTH_TOKEN"),
            twilio_phone_number: required("TWILIO_PHONE_NUMBER"),
            twilio_base_url: env::var("TWILIO_BASE_URL").unwrap_or_else(|_| {
                warn!("TWILIO_BASE_URL not set, using default");
                "https://api.twilio.com".to_string()
            }),
            notification_workers: with_default("NOTIFICATION_WORKERS", 4),
            notification_queue_capacity: with_default("NOTIFICATION_QUEUE_CAPACITY", 256),
            storage_backend: StorageBackend::Memory,
            port: with_default("PORT", 8080),
        };

        let database_configured = config.is_database_configured();
        config.storage_backend = match env::var("STORAGE_BACKEND").as_deref() {
            Ok("memory") => StorageBackend::Memory,
            Ok("supabase") => StorageBackend::Supabase,
            _ if database_configured => StorageBackend::Supabase,
            _ => {
                warn!("Database not configured - falling back to in-memory storage");
                StorageBackend::Memory
            }
        };

        if config.jwt_secret.is_empty() {
            warn!("Application not fully configured - tokens cannot be issued or validated");
        }

        config
    }

    pub fn is_database_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_service_key.is_empty()
    }

    pub fn is_email_configured(&self) -> bool {
        !self.email_api_url.is_empty() && !self.email_from.is_empty()
    }

    pub fn is_sms_configured(&self) -> bool {
        !self.twilio_account_sid.is_empty()
            && !self.twilio_auth_token.is_empty()
            && !self.twilio_phone_number.is_empty()
    }

    pub fn is_redis_configured(&self) -> bool {
        self.redis_url.is_some()
    }
}
