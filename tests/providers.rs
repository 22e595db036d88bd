use httpmock::Method::POST;
use httpmock::MockServer;
use serde_json::json;

use support_desk::error::SupportDeskError;
use support_desk::interfaces::providers::{LlmProvider, Notifier};
use support_desk::providers::mailer::HttpMailer;
use support_desk::providers::openai::OpenAiProvider;

#[tokio::test]
async fn openai_provider_via_httpmock() {
    let server = MockServer::start_async().await;
    let chat_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/chat/completions")
                .json_body_partial(json!({ "model": "gpt-4o-mini" }).to_string());
            then.status(200).json_body(json!({
                "id": "chatcmpl-1",
                "object": "chat.completion",
                "created": 1,
                "model": "gpt-4o-mini",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "hello"},
                    "finish_reason": "stop"
                }]
            }));
        })
        .await;

    let provider = OpenAiProvider::new(
        "key".to_string(),
        Some("gpt-4o-mini".to_string()),
        Some(server.base_url()),
    );
    let text = provider.generate_text("hi", "be helpful").await.unwrap();
    assert_eq!(text, "hello");

    chat_mock.assert_hits(1);
}

#[tokio::test]
async fn openai_provider_maps_http_errors_to_upstream() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(500).json_body(json!({ "error": "boom" }));
        })
        .await;

    let provider = OpenAiProvider::new("key".to_string(), None, Some(server.base_url()));
    let err = provider.generate_text("hi", "").await.unwrap_err();
    assert!(matches!(err, SupportDeskError::Upstream(_)));
}

fn test_mailer(server: &MockServer) -> HttpMailer {
    HttpMailer::new(
        server.base_url(),
        "relay-key".to_string(),
        "support@x.com".to_string(),
        "support-team@x.com".to_string(),
        "https://app.x.com".to_string(),
    )
}

#[tokio::test]
async fn mailer_posts_password_reset_with_link() {
    let server = MockServer::start_async().await;
    let mail_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/messages")
                .header("authorization", "Bearer relay-key")
                .json_body_partial(
                    json!({
                        "from": "support@x.com",
                        "to": "ana@x.com",
                        "subject": "Password Reset Request - AI Support",
                    })
                    .to_string(),
                )
                .body_contains("https://app.x.com/reset-password?token=tok-1");
            then.status(200).json_body(json!({ "id": "msg-1" }));
        })
        .await;

    test_mailer(&server)
        .send_password_reset("ana@x.com", "tok-1")
        .await
        .unwrap();
    mail_mock.assert_hits(1);
}

#[tokio::test]
async fn mailer_routes_escalation_alert_to_support_address() {
    let server = MockServer::start_async().await;
    let mail_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/messages")
                .json_body_partial(
                    json!({
                        "to": "support-team@x.com",
                        "subject": "Escalated Support Request from ana@x.com",
                    })
                    .to_string(),
                )
                .body_contains("double charged");
            then.status(200).json_body(json!({ "id": "msg-2" }));
        })
        .await;

    test_mailer(&server)
        .send_escalation_alert("ana@x.com", "Billing dispute.", "double charged")
        .await
        .unwrap();
    mail_mock.assert_hits(1);
}

#[tokio::test]
async fn mailer_surfaces_relay_failure() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/messages");
            then.status(502).json_body(json!({ "error": "relay down" }));
        })
        .await;

    let err = test_mailer(&server)
        .send_summary_copy("ana@x.com", "Summary.")
        .await
        .unwrap_err();
    assert!(matches!(err, SupportDeskError::Upstream(_)));
}
