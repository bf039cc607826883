use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, error, info, warn};

use notification_cell::Notifier;
use shared_config::AppConfig;
use shared_database::users::UserDirectory;
use shared_models::auth::Role;
use shared_models::user::UserAccount;
use shared_utils::jwt::issue_token;

use crate::models::{AuthError, OtpChannel, OtpVerification};
use crate::services::store::{CodeCheck, OtpStore};

pub fn generate_code() -> String {
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000))
}

/// Issues and verifies one-time codes sent by SMS or email, then exchanges a verified
/// code for a bearer token.
pub struct OtpService {
    store: Arc<dyn OtpStore>,
    users: Arc<dyn UserDirectory>,
    notifier: Arc<dyn Notifier>,
    config: Arc<AppConfig>,
}

impl OtpService {
    pub fn new(
        store: Arc<dyn OtpStore>,
        users: Arc<dyn UserDirectory>,
        notifier: Arc<dyn Notifier>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            store,
            users,
            notifier,
            config,
        }
    }

    fn ttl(&self) -> Duration {
        Duration::from_secs(self.config.otp_ttl_seconds)
    }

    fn delivery_text(&self, code: &str) -> String {
        format!(
            "Your verification code is {}. It expires in {} minutes.",
            code,
            (self.config.otp_ttl_seconds / 60).max(1)
        )
    }

    pub async fn send_phone_otp(&self, phone: &str) -> Result<(), AuthError> {
        let phone = required(phone, "Phone number is required")?;
        let code = self.store_code(OtpChannel::Phone, phone).await?;

        self.notifier
            .send_sms(phone, &self.delivery_text(&code))
            .await
            .map_err(|e| {
                error!("Failed to send OTP SMS to {}: {}", phone, e);
                AuthError::Delivery(e.to_string())
            })?;

        info!("OTP sent to phone {}", phone);
        Ok(())
    }

    pub async fn send_email_otp(&self, email: &str) -> Result<(), AuthError> {
        let email = required(email, "Email is required")?;
        if !email.contains('@') {
            return Err(AuthError::InvalidInput("Invalid email address".to_string()));
        }
        let code = self.store_code(OtpChannel::Email, email).await?;

        self.notifier
            .send_email(email, "Your verification code", &self.delivery_text(&code))
            .await
            .map_err(|e| {
                error!("Failed to send OTP email to {}: {}", email, e);
                AuthError::Delivery(e.to_string())
            })?;

        info!("OTP sent to email {}", email);
        Ok(())
    }

    pub async fn verify_phone_otp(&self, phone: &str, code: &str) -> Result<OtpVerification, AuthError> {
        let phone = required(phone, "Phone number is required")?;
        self.consume_code(OtpChannel::Phone, phone, code).await?;

        let account = self.users.find_by_phone(phone).await?;
        self.exchange(phone, account)
    }

    pub async fn verify_email_otp(&self, email: &str, code: &str) -> Result<OtpVerification, AuthError> {
        let email = required(email, "Email is required")?;
        self.consume_code(OtpChannel::Email, email, code).await?;

        let account = self.users.find_by_email(email).await?;
        self.exchange(email, account)
    }

    async fn store_code(&self, channel: OtpChannel, destination: &str) -> Result<String, AuthError> {
        let code = generate_code();
        self.store
            .put(&channel.key(destination), &code, self.ttl())
            .await?;
        Ok(code)
    }

    /// Removes the code on success. A wrong code leaves the entry in place.
    async fn consume_code(&self, channel: OtpChannel, destination: &str, code: &str) -> Result<(), AuthError> {
        let key = channel.key(destination);
        match self.store.consume(&key, code.trim()).await? {
            CodeCheck::Consumed => Ok(()),
            CodeCheck::Mismatch => {
                warn!("Invalid OTP submitted for {}", key);
                Err(AuthError::InvalidCode)
            }
            CodeCheck::Missing => {
                debug!("No live OTP for {}", key);
                Err(AuthError::CodeExpired)
            }
        }
    }

    fn exchange(&self, destination: &str, account: Option<UserAccount>) -> Result<OtpVerification, AuthError> {
        let secret = &self.config.jwt_secret;
        let ttl_hours = self.config.jwt_ttl_hours;

        let verification = match account {
            Some(user) => OtpVerification {
                token: issue_token(&user.id.to_string(), user.role, user.is_approved, false, secret, ttl_hours)
                    .map_err(AuthError::TokenIssue)?,
                new_user: false,
                user: Some(user),
            },
            None => OtpVerification {
                token: issue_token(destination, Role::Patient, true, true, secret, ttl_hours)
                    .map_err(AuthError::TokenIssue)?,
                new_user: true,
                user: None,
            },
        };

        info!(
            "OTP verified for {} (new user: {})",
            destination, verification.new_user
        );
        Ok(verification)
    }
}

fn required<'a>(value: &'a str, message: &str) -> Result<&'a str, AuthError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AuthError::InvalidInput(message.to_string()));
    }
    Ok(value)
}
