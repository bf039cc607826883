use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error};

use shared_config::AppConfig;

use crate::error::NotificationError;

#[derive(Debug, Deserialize)]
struct TwilioMessage {
    sid: Option<String>,
}

/// Twilio Programmable Messaging over its REST API.
#[derive(Clone)]
pub struct TwilioSmsSender {
    client: Client,
    base_url: String,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

impl TwilioSmsSender {
    pub fn new(base_url: &str, account_sid: &str, auth_token: &str, from_number: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            account_sid: account_sid.to_string(),
            auth_token: auth_token.to_string(),
            from_number: from_number.to_string(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            &config.twilio_base_url,
            &config.twilio_account_sid,
            &config.twilio_auth_token,
            &config.twilio_phone_number,
        )
    }

    pub async fn send(&self, to: &str, body: &str) -> Result<(), NotificationError> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.account_sid
        );

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to), ("From", self.from_number.as_str()), ("Body", body)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Twilio SMS error ({}): {}", status, body);
            return Err(NotificationError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let message: TwilioMessage = response.json().await?;
        debug!("Message SID: {}", message.sid.as_deref().unwrap_or("unknown"));
        Ok(())
    }
}
