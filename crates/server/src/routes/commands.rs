//! Slack slash commands.
//!
//! `/approvals` lists tickets waiting for a decision. The reply goes through
//! the command's `response_url` because a Jira search can outlast Slack's
//! three second deadline.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use tracing::{Instrument, debug, info_span, instrument, warn};

use crate::error::AppError;
use crate::middleware::VerifiedSlackBody;
use crate::services::ack_gate;
use crate::slack::messages::build_pending_list;
use crate::slack::{Block, OutboundMessage, SlackError, SlashCommand};
use crate::state::AppState;

/// Maximum number of tickets listed.
pub const PENDING_LIMIT: usize = 20;

/// Create slash command routes.
pub fn router() -> Router<AppState> {
    Router::new().route("/slash/approvals", post(handle_approvals))
}

/// List tickets waiting for approval.
#[instrument(skip_all)]
async fn handle_approvals(
    State(state): State<AppState>,
    VerifiedSlackBody(body): VerifiedSlackBody,
) -> Result<Response, AppError> {
    let command: SlashCommand = parse_command(&body)?;
    debug!(user = %command.user_id, command = %command.command, "Slash command received");

    let (signal, gate) = ack_gate();
    let span = info_span!("slash_approvals", user = %command.user_id);
    tokio::spawn(
        async move {
            gate.released().await;

            let jql = &state.config().jira.pending_jql;
            let message = match state.tracker().search(jql, PENDING_LIMIT).await {
                Ok(issues) => build_pending_list(&issues, state.config().jira.site()),
                Err(e) => {
                    warn!(error = %e, "Pending approvals search failed");
                    OutboundMessage::new(
                        "Could not load pending approvals.",
                        vec![Block::section("⚠️ Could not load pending approvals from Jira.")],
                    )
                }
            };

            if let Err(e) = state.messenger().respond(&command.response_url, &message).await {
                warn!(error = %e, "Failed to respond to slash command");
            }
        }
        .instrument(span),
    );

    let mut response = StatusCode::OK.into_response();
    response.extensions_mut().insert(signal);
    Ok(response)
}

/// Decode a form-encoded slash command body.
fn parse_command(body: &str) -> Result<SlashCommand, SlackError> {
    let field = |name: &str| {
        url::form_urlencoded::parse(body.as_bytes())
            .find_map(|(key, value)| (key == name).then(|| value.into_owned()))
    };
    let required = |name: &str| {
        field(name).ok_or_else(|| SlackError::InvalidPayload(format!("Missing {name} field")))
    };

    Ok(SlashCommand {
        command: required("command")?,
        text: field("text").unwrap_or_default(),
        user_id: required("user_id")?,
        response_url: required("response_url")?,
    })
}
