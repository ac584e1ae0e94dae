//! Integration test support for the approval relay.
//!
//! Tests drive the real router through [`tower::ServiceExt::oneshot`] with
//! recording stand-ins for Slack and Jira, so every outbound call can be
//! asserted without network access.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p approval-relay-integration-tests
//! ```

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::missing_panics_doc)]

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use approval_relay_core::MessageRef;
use approval_relay_server::config::RelayConfig;
use approval_relay_server::slack::{
    ActionElement, Block, OutboundMessage, SIGNATURE_HEADER, SignatureVerifier, TIMESTAMP_HEADER,
};
use approval_relay_server::state::AppState;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, header};
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;

pub use approval_relay_server::test_support::{
    RecordingJira, RecordingSlack, SHARED_SECRET, SIGNING_SECRET, signed_config, test_config,
};

// =============================================================================
// Harness
// =============================================================================

/// Router wired to recording collaborators.
pub struct Harness {
    pub app: Router,
    pub slack: Arc<RecordingSlack>,
    pub jira: Arc<RecordingJira>,
}

impl Harness {
    #[must_use]
    pub fn new(config: RelayConfig, slack: RecordingSlack, jira: RecordingJira) -> Self {
        let slack = Arc::new(slack);
        let jira = Arc::new(jira);
        let state = AppState::from_parts(config, slack.clone(), slack.clone(), jira.clone());
        Self {
            app: approval_relay_server::app(state),
            slack,
            jira,
        }
    }

    /// Send one request through the router.
    pub async fn call(&self, request: Request<Body>) -> Response<Body> {
        self.app
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }
}

/// Read a response body as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body is readable");
    serde_json::from_slice(&bytes).expect("body is JSON")
}

/// Poll `condition` until it holds or two seconds pass.
pub async fn wait_until(condition: impl Fn() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

// =============================================================================
// Request Builders
// =============================================================================

/// `POST /notify-approver` with an optional bearer secret.
#[must_use]
pub fn notify_request(body: &Value, secret: Option<&str>) -> Request<Body> {
    let mut builder = Request::post("/notify-approver").header(header::CONTENT_TYPE, "application/json");
    if let Some(secret) = secret {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {secret}"));
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("valid request")
}

/// Form body carrying an interaction payload.
#[must_use]
pub fn interaction_body(payload: &Value) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .append_pair("payload", &payload.to_string())
        .finish()
}

/// Unsigned form `POST`.
#[must_use]
pub fn form_request(path: &str, body: String) -> Request<Body> {
    Request::post(path)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .expect("valid request")
}

/// Form `POST` signed with [`SIGNING_SECRET`] at the current time.
#[must_use]
pub fn signed_form_request(path: &str, body: String) -> Request<Body> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock after epoch")
        .as_secs()
        .to_string();
    let signature = SignatureVerifier::new(SecretString::from(SIGNING_SECRET))
        .sign(&timestamp, &body)
        .expect("signing succeeds");

    Request::post(path)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(TIMESTAMP_HEADER, timestamp)
        .header(SIGNATURE_HEADER, signature)
        .body(Body::from(body))
        .expect("valid request")
}

/// Block actions payload for a button click in a DM.
#[must_use]
pub fn click_payload(user: &str, action_id: &str, value: &str, origin: &MessageRef) -> Value {
    serde_json::json!({
        "type": "block_actions",
        "user": { "id": user, "username": "approver" },
        "container": {
            "type": "message",
            "message_ts": origin.ts.as_str(),
            "channel_id": origin.channel.as_str(),
        },
        "channel": { "id": origin.channel.as_str() },
        "message": { "ts": origin.ts.as_str() },
        "actions": [{
            "action_id": action_id,
            "block_id": "approval_decision",
            "type": "button",
            "value": value,
        }],
        "response_url": "https://hooks.slack.com/actions/T1/1/abc",
    })
}

/// `(action_id, value)` of every button in an actions block.
#[must_use]
pub fn button_values(message: &OutboundMessage) -> Vec<(String, String)> {
    message
        .blocks
        .iter()
        .filter_map(|block| match block {
            Block::Actions { elements, .. } => Some(elements),
            _ => None,
        })
        .flatten()
        .filter_map(|element| match element {
            ActionElement::Button {
                action_id, value, ..
            } => value.clone().map(|value| (action_id.clone(), value)),
        })
        .collect()
}
