use assert_matches::assert_matches;
use wiremock::matchers::{body_string_contains, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use notification_cell::{ChannelNotifier, HttpMailer, NotificationError, Notifier, TwilioSmsSender};

#[tokio::test]
async fn test_twilio_sender_posts_form() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/2010-04-01/Accounts/AC123/Messages.json"))
        .and(header_exists("authorization"))
        .and(body_string_contains("Body=Your+OTP+is+424242"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({ "sid": "SM1" })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let sender = TwilioSmsSender::new(&mock_server.uri(), "AC123", "token", "+15550000");
    sender.send("+15550100", "Your OTP is 424242").await.unwrap();
}

#[tokio::test]
async fn test_twilio_rejection_is_reported() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid number"))
        .mount(&mock_server)
        .await;

    let sender = TwilioSmsSender::new(&mock_server.uri(), "AC123", "token", "+15550000");
    let result = sender.send("bogus", "hi").await;
    assert_matches!(result, Err(NotificationError::Rejected { status: 400, .. }));
}

#[tokio::test]
async fn test_mailer_posts_json_with_bearer_key() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/send"))
        .and(header("authorization", "Bearer mail-key"))
        .and(body_string_contains("Reschedule Request from Doctor"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mailer = HttpMailer::new(
        &format!("{}/send", mock_server.uri()),
        "mail-key",
        "noreply@wello.health",
        "Wello",
    );
    mailer
        .send(
            "asha@example.com",
            "Reschedule Request from Doctor",
            "Your appointment has been rescheduled.",
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_unconfigured_channels_report_not_configured() {
    let notifier = ChannelNotifier::new(None, None);

    assert_matches!(
        notifier.send_email("a@example.com", "s", "b").await,
        Err(NotificationError::NotConfigured("email"))
    );
    assert_matches!(
        notifier.send_sms("+15550100", "b").await,
        Err(NotificationError::NotConfigured("sms"))
    );
}
