use async_trait::async_trait;
use tracing::info;

use shared_config::AppConfig;

use crate::error::NotificationError;
use crate::services::email::HttpMailer;
use crate::services::sms::TwilioSmsSender;

/// Outbound message transport. Implementations deliver synchronously; callers that
/// must not wait go through [`crate::NotificationDispatcher`].
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), NotificationError>;
    async fn send_sms(&self, to: &str, body: &str) -> Result<(), NotificationError>;
}

/// Email through the mail relay and SMS through Twilio. A channel without credentials
/// reports `NotConfigured` instead of failing at startup.
pub struct ChannelNotifier {
    mailer: Option<HttpMailer>,
    sms: Option<TwilioSmsSender>,
}

impl ChannelNotifier {
    pub fn new(mailer: Option<HttpMailer>, sms: Option<TwilioSmsSender>) -> Self {
        Self { mailer, sms }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let mailer = config
            .is_email_configured()
            .then(|| HttpMailer::from_config(config));
        let sms = config
            .is_sms_configured()
            .then(|| TwilioSmsSender::from_config(config));

        info!(
            "Notification channels: email={}, sms={}",
            mailer.is_some(),
            sms.is_some()
        );

        Self::new(mailer, sms)
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), NotificationError> {
        match &self.mailer {
            Some(mailer) => mailer.send(to, subject, body).await,
            None => Err(NotificationError::NotConfigured("email")),
        }
    }

    async fn send_sms(&self, to: &str, body: &str) -> Result<(), NotificationError> {
        match &self.sms {
            Some(sms) => sms.send(to, body).await,
            None => Err(NotificationError::NotConfigured("sms")),
        }
    }
}
