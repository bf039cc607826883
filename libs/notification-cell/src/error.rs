use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Channel not configured: {0}")]
    NotConfigured(&'static str),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Provider rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Notification queue is full")]
    QueueFull,

    #[error("Notification queue is closed")]
    QueueClosed,
}
