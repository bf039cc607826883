use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::error::NotificationError;
use crate::models::{DispatcherConfig, NotificationJob, NotificationMessage};
use crate::services::notifier::Notifier;

/// Handle to the notification worker pool. Cloning shares the same queue.
///
/// Enqueueing never waits: when the queue is full the message is dropped and the
/// caller's request carries on. Delivery failures are logged by the workers and
/// never reach the code that triggered the notification.
#[derive(Clone)]
pub struct NotificationDispatcher {
    sender: mpsc::Sender<NotificationJob>,
}

impl NotificationDispatcher {
    /// Spawns `worker_count` workers draining a queue of `queue_capacity` jobs.
    /// Workers exit once every dispatcher handle has been dropped and the queue is empty.
    pub fn start(
        config: DispatcherConfig,
        transport: Arc<dyn Notifier>,
    ) -> (Self, Vec<JoinHandle<()>>) {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));

        info!(
            "Starting notification dispatcher with {} workers (queue capacity {})",
            config.worker_count, config.queue_capacity
        );

        let handles = (0..config.worker_count.max(1))
            .map(|i| {
                let receiver = Arc::clone(&receiver);
                let transport = Arc::clone(&transport);
                let worker_name = format!("notification-worker-{}", i);
                tokio::spawn(async move { worker_loop(worker_name, receiver, transport).await })
            })
            .collect();

        (Self { sender }, handles)
    }

    pub fn dispatch(&self, message: NotificationMessage) -> Result<(), NotificationError> {
        let job = NotificationJob::new(message);
        let job_id = job.job_id;
        let channel = job.message.channel();

        match self.sender.try_send(job) {
            Ok(()) => {
                debug!("Queued {} notification {}", channel, job_id);
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Notification queue full, dropping {} notification {}", channel, job_id);
                Err(NotificationError::QueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("Notification queue closed, dropping {} notification {}", channel, job_id);
                Err(NotificationError::QueueClosed)
            }
        }
    }

    /// Fire-and-forget email. Enqueue failures are already logged by [`Self::dispatch`].
    pub fn notify_email(&self, to: &str, subject: &str, body: &str) {
        let _ = self.dispatch(NotificationMessage::Email {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
    }

    pub fn notify_sms(&self, to: &str, body: &str) {
        let _ = self.dispatch(NotificationMessage::Sms {
            to: to.to_string(),
            body: body.to_string(),
        });
    }
}

#[instrument(skip(receiver, transport))]
async fn worker_loop(
    worker_name: String,
    receiver: Arc<Mutex<mpsc::Receiver<NotificationJob>>>,
    transport: Arc<dyn Notifier>,
) {
    debug!("Worker loop started: {}", worker_name);

    loop {
        // Hold the lock only while waiting for the next job.
        let job = { receiver.lock().await.recv().await };
        let Some(job) = job else {
            break;
        };

        let started = Instant::now();
        match deliver(transport.as_ref(), &job.message).await {
            Ok(()) => debug!(
                "Delivered {} notification {} in {}ms",
                job.message.channel(),
                job.job_id,
                started.elapsed().as_millis()
            ),
            Err(e) => warn!(
                "Failed to deliver {} notification {}: {}",
                job.message.channel(),
                job.job_id,
                e
            ),
        }
    }

    debug!("Worker {} stopped", worker_name);
}

/// Sends one message over the channel it names.
pub async fn deliver(
    transport: &dyn Notifier,
    message: &NotificationMessage,
) -> Result<(), NotificationError> {
    match message {
        NotificationMessage::Email { to, subject, body } => {
            transport.send_email(to, subject, body).await
        }
        NotificationMessage::Sms { to, body } => transport.send_sms(to, body).await,
    }
}
