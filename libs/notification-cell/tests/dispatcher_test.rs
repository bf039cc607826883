use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;

use notification_cell::test_utils::{FailingNotifier, RecordingNotifier};
use notification_cell::{DispatcherConfig, NotificationDispatcher, NotificationError, NotificationMessage};

fn config(worker_count: usize, queue_capacity: usize) -> DispatcherConfig {
    DispatcherConfig {
        worker_count,
        queue_capacity,
    }
}

#[tokio::test]
async fn test_dispatched_messages_are_delivered() {
    let recorder = Arc::new(RecordingNotifier::new());
    let (dispatcher, _handles) = NotificationDispatcher::start(config(2, 8), recorder.clone());

    dispatcher.notify_email("asha@example.com", "Appointment Cancelled", "Cancelled by the patient.");
    dispatcher.notify_sms("+15550100", "Your OTP is 123456");

    let sent = recorder.wait_for(2, Duration::from_secs(2)).await;
    assert_eq!(sent.len(), 2);
    assert!(sent.contains(&NotificationMessage::Sms {
        to: "+15550100".to_string(),
        body: "Your OTP is 123456".to_string(),
    }));
    assert!(sent.iter().any(|m| m.channel() == "email"));
}

#[tokio::test]
async fn test_delivery_failures_do_not_stop_workers() {
    let (dispatcher, handles) = NotificationDispatcher::start(config(1, 4), Arc::new(FailingNotifier));

    assert!(dispatcher
        .dispatch(NotificationMessage::Sms {
            to: "+15550100".to_string(),
            body: "hello".to_string(),
        })
        .is_ok());

    drop(dispatcher);
    for handle in handles {
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("worker should stop once the queue closes")
            .expect("worker should not panic");
    }
}

#[tokio::test(flavor = "current_thread")]
async fn test_full_queue_drops_instead_of_blocking() {
    let recorder = Arc::new(RecordingNotifier::new());
    // On a current-thread runtime the worker cannot drain the queue until this task yields.
    let (dispatcher, _handles) = NotificationDispatcher::start(config(1, 1), recorder.clone());

    let message = NotificationMessage::Sms {
        to: "+15550100".to_string(),
        body: "first".to_string(),
    };

    assert!(dispatcher.dispatch(message.clone()).is_ok());
    assert_matches!(dispatcher.dispatch(message), Err(NotificationError::QueueFull));

    let sent = recorder.wait_for(1, Duration::from_secs(2)).await;
    assert_eq!(sent.len(), 1);
}
