//! Integration tests for the `/approvals` slash command and the health check.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use approval_relay_integration_tests::{
    Harness, RecordingJira, RecordingSlack, form_request, signed_config, signed_form_request,
    test_config, wait_until,
};
use axum::body::Body;
use axum::http::{Request, StatusCode};

const RESPONSE_URL: &str = "https://hooks.slack.com/commands/T1/2/xyz";

fn command_body() -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .append_pair("command", "/approvals")
        .append_pair("text", "")
        .append_pair("user_id", "U1")
        .append_pair("response_url", RESPONSE_URL)
        .finish()
}

#[tokio::test]
async fn test_pending_list_sent_to_response_url() {
    let h = Harness::new(
        test_config(),
        RecordingSlack::default(),
        RecordingJira::default().with_pending(&[
            ("IAM-100", "Grant prod access"),
            ("IAM-101", "Rotate deploy keys"),
        ]),
    );

    let status = h
        .call(form_request("/slash/approvals", command_body()))
        .await
        .status();
    assert_eq!(status, StatusCode::OK);

    assert!(wait_until(|| !h.slack.responses().is_empty()).await);

    let searches = h.jira.searches();
    assert_eq!(searches.len(), 1);
    assert_eq!(searches[0].1, 20);

    let (url, message) = &h.slack.responses()[0];
    assert_eq!(url, RESPONSE_URL);
    assert!(message.text.starts_with("2 tickets"));
    let rendered = serde_json::to_string(message).unwrap();
    assert!(rendered.contains("https://corp.atlassian.net/browse/IAM-101"));
}

#[tokio::test]
async fn test_empty_pending_list() {
    let h = Harness::new(test_config(), RecordingSlack::default(), RecordingJira::default());

    h.call(form_request("/slash/approvals", command_body())).await;

    assert!(wait_until(|| !h.slack.responses().is_empty()).await);
    assert_eq!(
        h.slack.responses()[0].1.text,
        "Nothing is waiting for approval."
    );
}

#[tokio::test]
async fn test_missing_response_url_is_bad_request() {
    let h = Harness::new(test_config(), RecordingSlack::default(), RecordingJira::default());

    let response = h
        .call(form_request(
            "/slash/approvals",
            "command=%2Fapprovals&user_id=U1".to_string(),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unsigned_command_rejected_when_secret_configured() {
    let h = Harness::new(signed_config(), RecordingSlack::default(), RecordingJira::default());

    let response = h.call(form_request("/slash/approvals", command_body())).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = h
        .call(signed_form_request("/slash/approvals", command_body()))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_health_check() {
    let h = Harness::new(test_config(), RecordingSlack::default(), RecordingJira::default());

    let response = h
        .call(Request::get("/health").body(Body::empty()).unwrap())
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
    assert_eq!(&bytes[..], b"ok");
}
