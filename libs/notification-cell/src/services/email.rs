use reqwest::Client;
use serde_json::json;
use tracing::{debug, error};

use shared_config::AppConfig;

use crate::error::NotificationError;

/// Sends mail through an HTTP relay (`POST {api_url}` with a bearer key).
#[derive(Clone)]
pub struct HttpMailer {
    client: Client,
    api_url: String,
    api_key: String,
    from: String,
    from_name: String,
}

impl HttpMailer {
    pub fn new(api_url: &str, api_key: &str, from: &str, from_name: &str) -> Self {
        Self {
            client: Client::new(),
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
            from: from.to_string(),
            from_name: from_name.to_string(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            &config.email_api_url,
            &config.email_api_key,
            &config.email_from,
            &config.email_from_name,
        )
    }

    pub async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotificationError> {
        let payload = json!({
            "from": { "email": self.from, "name": self.from_name },
            "to": [{ "email": to }],
            "subject": subject,
            "text": body,
        });

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Mail relay rejected message to {} ({}): {}", to, status, body);
            return Err(NotificationError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!("Email '{}' accepted for {}", subject, to);
        Ok(())
    }
}
