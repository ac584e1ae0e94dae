//! Approval request fan-out.
//!
//! One approval request becomes one direct message per approver. Recipients
//! are handled strictly in order with a fixed pause between sends so a large
//! approver list stays under Slack's per-method rate limit. A failure for one
//! recipient is recorded in its result and never stops the others.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use approval_relay_core::{ActionToken, Decision, TicketKey, TokenError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};

use super::identity::IdentityResolver;
use crate::config::{JiraConfig, RelayConfig, TransitionConfig};
use crate::jira::{IssueTracker, JiraError};
use crate::slack::messages::{RequestCard, build_request_message};
use crate::slack::{IdentityDirectory, Messenger, OutboundMessage};

/// Errors that abort a whole dispatch.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The request cannot be served as submitted.
    #[error("{0}")]
    InvalidRequest(String),

    /// A lookup shared by every message failed.
    #[error("ticket lookup failed: {0}")]
    Upstream(#[from] JiraError),

    /// A button token could not be produced.
    #[error(transparent)]
    Token(#[from] TokenError),
}

/// Approver addresses as submitted: one string or a list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Recipients {
    /// A single string, possibly comma separated.
    One(String),
    /// A list of addresses.
    Many(Vec<String>),
}

impl Default for Recipients {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl Recipients {
    /// Trimmed, non-blank addresses in submission order.
    #[must_use]
    pub fn normalize(&self) -> Vec<String> {
        let addresses: Box<dyn Iterator<Item = &str>> = match self {
            Self::One(list) => Box::new(list.split(',')),
            Self::Many(list) => Box::new(list.iter().map(String::as_str)),
        };
        addresses
            .map(str::trim)
            .filter(|address| !address.is_empty())
            .map(ToString::to_string)
            .collect()
    }
}

/// A ticket that needs sign-off.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequest {
    /// Ticket to decide on.
    pub ticket_key: TicketKey,
    /// One-line summary; looked up in Jira when absent.
    #[serde(default)]
    pub summary: Option<String>,
    /// Browser URL; derived from the Jira site when absent.
    #[serde(default)]
    pub url: Option<String>,
    /// Who asked for the approval.
    pub requester_address: String,
    /// Who should decide.
    #[serde(default)]
    pub approver_addresses: Recipients,
    /// Additional name/value pairs shown in the message.
    #[serde(default)]
    pub extra_fields: BTreeMap<String, String>,
}

/// Delivery result for one approver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchResult {
    /// Address as submitted (trimmed).
    pub address: String,
    /// Whether the message was sent.
    pub ok: bool,
    /// Why it was not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DispatchResult {
    fn sent(address: String) -> Self {
        Self {
            address,
            ok: true,
            error: None,
        }
    }

    fn failed(address: String, error: String) -> Self {
        Self {
            address,
            ok: false,
            error: Some(error),
        }
    }
}

/// Sends approval requests to approvers.
#[derive(Clone)]
pub struct NotificationDispatcher {
    resolver: IdentityResolver,
    messenger: Arc<dyn Messenger>,
    tracker: Arc<dyn IssueTracker>,
    jira: JiraConfig,
    transitions: TransitionConfig,
    send_interval: Duration,
}

impl NotificationDispatcher {
    /// Create a dispatcher.
    #[must_use]
    pub fn new(
        config: &RelayConfig,
        directory: Arc<dyn IdentityDirectory>,
        messenger: Arc<dyn Messenger>,
        tracker: Arc<dyn IssueTracker>,
    ) -> Self {
        Self {
            resolver: IdentityResolver::new(directory),
            messenger,
            tracker,
            jira: config.jira.clone(),
            transitions: config.transitions,
            send_interval: config.send_interval,
        }
    }

    /// Notify every approver of a request.
    ///
    /// Returns one result per normalized address, in order.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidRequest`] before any external call if
    /// no address remains after normalization, or [`DispatchError::Upstream`]
    /// if the ticket summary had to be looked up and the lookup failed.
    #[instrument(skip(self, request), fields(ticket = %request.ticket_key))]
    pub async fn dispatch(
        &self,
        request: &ApprovalRequest,
    ) -> Result<Vec<DispatchResult>, DispatchError> {
        let addresses = request.approver_addresses.normalize();
        if addresses.is_empty() {
            return Err(DispatchError::InvalidRequest(
                "approverAddresses must contain at least one address".to_string(),
            ));
        }

        let message = self.compose(request).await?;

        let mut results = Vec::with_capacity(addresses.len());
        for (index, address) in addresses.into_iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.send_interval).await;
            }

            let delivery = match self.resolver.resolve(&address).await {
                Ok(user) => self
                    .messenger
                    .send(&user, &message)
                    .await
                    .map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };

            results.push(match delivery {
                Ok(target) => {
                    info!(address = %address, target = %target, "Approval request sent");
                    DispatchResult::sent(address)
                }
                Err(error) => {
                    warn!(address = %address, error = %error, "Approval request not delivered");
                    DispatchResult::failed(address, error)
                }
            });
        }

        let delivered = results.iter().filter(|r| r.ok).count();
        info!(delivered, total = results.len(), "Dispatch finished");
        Ok(results)
    }

    /// Build the message shared by every recipient.
    async fn compose(&self, request: &ApprovalRequest) -> Result<OutboundMessage, DispatchError> {
        let key = &request.ticket_key;

        let summary = match non_blank(request.summary.as_deref()) {
            Some(summary) => summary.to_string(),
            None => self.tracker.get_issue(key).await?.summary,
        };
        let url = non_blank(request.url.as_deref())
            .map_or_else(|| self.jira.browse_url(key), ToString::to_string);

        let token_for = |decision: Decision| {
            ActionToken {
                ticket_key: key.clone(),
                transition_id: self.transitions.for_decision(decision),
                decision,
                origin: None,
                url: url.clone(),
            }
            .encode()
        };
        let approve = token_for(Decision::Approve)?;
        let reject = token_for(Decision::Reject)?;

        Ok(build_request_message(
            &RequestCard {
                ticket_key: key,
                summary: &summary,
                url: &url,
                requester: request.requester_address.trim(),
                extra_fields: &request.extra_fields,
            },
            &approve,
            &reject,
        ))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Instant;

    use approval_relay_core::{SlackUserId, TransitionId};
    use serde_json::json;

    use super::*;
    use crate::test_support::{RecordingJira, RecordingSlack, test_config};
    use crate::slack::{ActionElement, Block};

    fn request(approvers: serde_json::Value) -> ApprovalRequest {
        serde_json::from_value(json!({
            "ticketKey": "IAM-100",
            "summary": "Grant prod access",
            "requesterAddress": "sam@corp.io",
            "approverAddresses": approvers,
        }))
        .unwrap()
    }

    fn dispatcher(slack: &Arc<RecordingSlack>, jira: &Arc<RecordingJira>) -> NotificationDispatcher {
        NotificationDispatcher::new(&test_config(), slack.clone(), slack.clone(), jira.clone())
    }

    fn button_values(message: &OutboundMessage) -> Vec<(String, String)> {
        message
            .blocks
            .iter()
            .filter_map(|block| match block {
                Block::Actions { elements, .. } => Some(elements),
                _ => None,
            })
            .flatten()
            .map(|ActionElement::Button { action_id, value, .. }| {
                (action_id.clone(), value.clone().unwrap_or_default())
            })
            .collect()
    }

    #[test]
    fn test_normalize_recipients() {
        let one = Recipients::One(" a@corp.io, ,b@corp.io,".to_string());
        assert_eq!(one.normalize(), vec!["a@corp.io", "b@corp.io"]);

        let many = Recipients::Many(vec!["  ".into(), "c@corp.io".into()]);
        assert_eq!(many.normalize(), vec!["c@corp.io"]);
    }

    #[tokio::test]
    async fn test_results_follow_input_order() {
        let slack = Arc::new(RecordingSlack::with_users(&[
            ("a@corp.io", "UA"),
            ("b@corp.io", "UB"),
            ("c@corp.io", "UC"),
        ]));
        let jira = Arc::new(RecordingJira::default());

        let results = dispatcher(&slack, &jira)
            .dispatch(&request(json!(["c@corp.io", "a@corp.io", "b@corp.io"])))
            .await
            .unwrap();

        let addresses: Vec<_> = results.iter().map(|r| r.address.as_str()).collect();
        assert_eq!(addresses, vec!["c@corp.io", "a@corp.io", "b@corp.io"]);
        assert!(results.iter().all(|r| r.ok));
        let recipients: Vec<_> = slack.sent().into_iter().map(|(user, _)| user).collect();
        assert_eq!(
            recipients,
            vec![SlackUserId::new("UC"), SlackUserId::new("UA"), SlackUserId::new("UB")]
        );
    }

    #[tokio::test]
    async fn test_blank_recipients_rejected_without_calls() {
        let slack = Arc::new(RecordingSlack::default());
        let jira = Arc::new(RecordingJira::default());

        for approvers in [json!([]), json!(" , "), json!(["", "  "])] {
            let err = dispatcher(&slack, &jira)
                .dispatch(&request(approvers))
                .await
                .unwrap_err();
            assert!(matches!(err, DispatchError::InvalidRequest(_)));
        }
        assert!(slack.lookups().is_empty());
        assert!(slack.sent().is_empty());
        assert_eq!(jira.issue_lookups(), 0);
    }

    #[tokio::test]
    async fn test_failure_is_isolated_per_recipient() {
        let slack = Arc::new(RecordingSlack::with_users(&[("b@corp.io", "UB")]));
        let jira = Arc::new(RecordingJira::default());

        let results = dispatcher(&slack, &jira)
            .dispatch(&request(json!("a@corp.io,b@corp.io")))
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert!(!results[0].ok);
        assert!(results[0].error.as_deref().unwrap().contains("a@corp.io"));
        assert_eq!(results[1], DispatchResult::sent("b@corp.io".to_string()));
    }

    #[tokio::test]
    async fn test_send_failure_is_recorded() {
        let slack = Arc::new(
            RecordingSlack::with_users(&[("a@corp.io", "UA"), ("b@corp.io", "UB")]).failing_for("UA"),
        );
        let jira = Arc::new(RecordingJira::default());

        let results = dispatcher(&slack, &jira)
            .dispatch(&request(json!(["a@corp.io", "b@corp.io"])))
            .await
            .unwrap();

        assert!(!results[0].ok);
        assert!(results[1].ok);
        assert_eq!(slack.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_paces_between_recipients() {
        let slack = Arc::new(RecordingSlack::with_users(&[
            ("a@corp.io", "UA"),
            ("b@corp.io", "UB"),
            ("c@corp.io", "UC"),
        ]));
        let jira = Arc::new(RecordingJira::default());
        let mut config = test_config();
        config.send_interval = Duration::from_millis(40);
        let dispatcher =
            NotificationDispatcher::new(&config, slack.clone(), slack.clone(), jira.clone());

        let started = Instant::now();
        dispatcher
            .dispatch(&request(json!(["a@corp.io", "b@corp.io", "c@corp.io"])))
            .await
            .unwrap();
        assert!(started.elapsed() >= Duration::from_millis(80));
    }

    #[tokio::test]
    async fn test_buttons_carry_decision_tokens() {
        let slack = Arc::new(RecordingSlack::with_users(&[("a@corp.io", "UA")]));
        let jira = Arc::new(RecordingJira::default());

        dispatcher(&slack, &jira)
            .dispatch(&request(json!(["a@corp.io"])))
            .await
            .unwrap();

        let (_, message) = slack.sent().remove(0);
        let buttons = button_values(&message);
        assert_eq!(buttons.len(), 2);

        let approve = ActionToken::decode(&buttons[0].1).unwrap();
        assert_eq!(buttons[0].0, "approve");
        assert_eq!(approve.decision, Decision::Approve);
        assert_eq!(approve.transition_id, TransitionId::new(61));
        assert_eq!(approve.url, "https://corp.atlassian.net/browse/IAM-100");

        let reject = ActionToken::decode(&buttons[1].1).unwrap();
        assert_eq!(reject.decision, Decision::Reject);
        assert_eq!(reject.transition_id, TransitionId::new(71));
    }

    #[tokio::test]
    async fn test_missing_summary_is_looked_up() {
        let slack = Arc::new(RecordingSlack::with_users(&[("a@corp.io", "UA")]));
        let jira = Arc::new(RecordingJira::default().with_issue("IAM-100", "Looked up summary"));
        let mut request = request(json!(["a@corp.io"]));
        request.summary = None;

        dispatcher(&slack, &jira).dispatch(&request).await.unwrap();

        assert_eq!(jira.issue_lookups(), 1);
        assert!(slack.sent()[0].1.text.contains("Looked up summary"));
    }

    #[tokio::test]
    async fn test_failed_summary_lookup_is_fatal() {
        let slack = Arc::new(RecordingSlack::with_users(&[("a@corp.io", "UA")]));
        let jira = Arc::new(RecordingJira::default());
        let mut request = request(json!(["a@corp.io"]));
        request.summary = Some("  ".to_string());

        let err = dispatcher(&slack, &jira).dispatch(&request).await.unwrap_err();
        assert!(matches!(err, DispatchError::Upstream(_)));
        assert!(slack.sent().is_empty());
    }
}
