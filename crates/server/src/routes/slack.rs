//! Slack interactivity handler.
//!
//! Handles Approve/Reject clicks. The handler only parses and acknowledges;
//! the decision is executed after the empty `200` has been handed to the
//! server (see [`crate::services::executor`]).

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use tracing::{debug, instrument};

use crate::error::AppError;
use crate::middleware::VerifiedSlackBody;
use crate::services::InteractionEvent;
use crate::slack::{InteractionPayload, SlackError};
use crate::state::AppState;

/// Create Slack interactivity routes.
pub fn router() -> Router<AppState> {
    Router::new().route("/interactive-action", post(handle_interaction))
}

/// Handle a Slack interaction callback.
#[instrument(skip_all)]
async fn handle_interaction(
    State(state): State<AppState>,
    VerifiedSlackBody(body): VerifiedSlackBody,
) -> Result<Response, AppError> {
    let payload = parse_payload(&body)?;

    let Some(event) = InteractionEvent::from_payload(&payload)? else {
        return Ok(StatusCode::OK.into_response());
    };

    debug!(actor = %event.actor, "Acknowledging decision");
    let (signal, _handle) = state.executor().spawn(event);

    // The executor starts once this response (and the signal with it) is
    // dropped by the server.
    let mut response = StatusCode::OK.into_response();
    response.extensions_mut().insert(signal);
    Ok(response)
}

/// Extract the JSON `payload` field from a form-encoded body.
fn parse_payload(body: &str) -> Result<InteractionPayload, SlackError> {
    let raw = url::form_urlencoded::parse(body.as_bytes())
        .find_map(|(key, value)| (key == "payload").then_some(value))
        .ok_or_else(|| SlackError::InvalidPayload("Missing payload field".to_string()))?;

    serde_json::from_str(&raw)
        .map_err(|e| SlackError::InvalidPayload(format!("Failed to parse payload: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_payload() {
        let json = r#"{"type":"block_actions","user":{"id":"U1"},"actions":[{"action_id":"approve","value":"v1.x","type":"button"}]}"#;
        let body: String = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("payload", json)
            .finish();

        let payload = parse_payload(&body).unwrap();
        assert_eq!(payload.user.id, "U1");
        assert_eq!(payload.actions[0].value.as_deref(), Some("v1.x"));
    }

    #[test]
    fn test_parse_payload_rejects_garbage() {
        assert!(matches!(
            parse_payload("foo=bar"),
            Err(SlackError::InvalidPayload(_))
        ));
        assert!(matches!(
            parse_payload("payload=%7Bnot-json"),
            Err(SlackError::InvalidPayload(_))
        ));
    }
}
