use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::NotificationError;
use crate::models::NotificationMessage;
use crate::services::notifier::Notifier;

/// Notifier that records every message instead of sending it.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<NotificationMessage>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn messages(&self) -> Vec<NotificationMessage> {
        self.sent.lock().await.clone()
    }

    /// Polls until at least `count` messages arrived or `timeout` elapsed.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> Vec<NotificationMessage> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let sent = self.messages().await;
            if sent.len() >= count || tokio::time::Instant::now() >= deadline {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), NotificationError> {
        self.sent.lock().await.push(NotificationMessage::Email {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }

    async fn send_sms(&self, to: &str, body: &str) -> Result<(), NotificationError> {
        self.sent.lock().await.push(NotificationMessage::Sms {
            to: to.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

/// Notifier whose every send fails.
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send_email(&self, _to: &str, _subject: &str, _body: &str) -> Result<(), NotificationError> {
        Err(NotificationError::Rejected {
            status: 503,
            body: "mail relay unavailable".to_string(),
        })
    }

    async fn send_sms(&self, _to: &str, _body: &str) -> Result<(), NotificationError> {
        Err(NotificationError::Rejected {
            status: 503,
            body: "sms provider unavailable".to_string(),
        })
    }
}
