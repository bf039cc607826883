use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_config::AppConfig;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "channel", rename_all = "snake_case")]
pub enum NotificationMessage {
    Email {
        to: String,
        subject: String,
        body: String,
    },
    Sms {
        to: String,
        body: String,
    },
}

impl NotificationMessage {
    pub fn channel(&self) -> &'static str {
        match self {
            NotificationMessage::Email { .. } => "email",
            NotificationMessage::Sms { .. } => "sms",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationJob {
    pub job_id: Uuid,
    pub message: NotificationMessage,
    pub created_at: DateTime<Utc>,
}

impl NotificationJob {
    pub fn new(message: NotificationMessage) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            message,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub worker_count: usize,
    pub queue_capacity: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            queue_capacity: 256,
        }
    }
}

impl From<&AppConfig> for DispatcherConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            worker_count: config.notification_workers.max(1),
            queue_capacity: config.notification_queue_capacity.max(1),
        }
    }
}
