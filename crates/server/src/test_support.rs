//! In-memory collaborators for tests.
//!
//! Used by the unit tests in this crate and, through the `test-support`
//! feature, by `approval-relay-integration-tests`.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use approval_relay_core::{Email, MessageRef, SlackUserId, TicketKey, TransitionId};
use async_trait::async_trait;

use crate::config::RelayConfig;
use crate::jira::{IssueFields, IssueSummary, IssueTracker, JiraError};
use crate::slack::{IdentityDirectory, Messenger, OutboundMessage, SlackError, UserProfile};

/// Bearer secret accepted by `/notify-approver` under [`test_config`].
pub const SHARED_SECRET: &str = "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6";

/// Slack signing secret used by [`signed_config`].
pub const SIGNING_SECRET: &str = "8f742231b10e8888abcd99yyyzzz85a5";

fn config_with(extra: &[(&'static str, &'static str)]) -> RelayConfig {
    let mut env: HashMap<&str, &str> = HashMap::from([
        ("SLACK_BOT_TOKEN", "xoxb-1-2-abc"),
        ("RELAY_SHARED_SECRET", SHARED_SECRET),
        ("JIRA_BASE_URL", "https://corp.atlassian.net"),
        ("JIRA_EMAIL", "bot@corp.io"),
        ("JIRA_API_TOKEN", "ATATT3xFfGF0"),
    ]);
    env.extend(extra.iter().copied());

    let mut config = RelayConfig::from_lookup(&|key| env.get(key).map(ToString::to_string))
        .expect("test configuration is valid");
    config.send_interval = Duration::ZERO;
    config
}

/// Configuration with test credentials, no send pacing and no signature
/// verification.
#[must_use]
pub fn test_config() -> RelayConfig {
    config_with(&[])
}

/// Like [`test_config`], but Slack callbacks must be signed with
/// [`SIGNING_SECRET`].
#[must_use]
pub fn signed_config() -> RelayConfig {
    config_with(&[("SLACK_SIGNING_SECRET", SIGNING_SECRET)])
}

// =============================================================================
// Slack
// =============================================================================

/// Slack stand-in recording every lookup, send, rewrite and reply.
#[derive(Default)]
pub struct RecordingSlack {
    users: HashMap<String, SlackUserId>,
    profiles: HashMap<SlackUserId, UserProfile>,
    failing_recipients: HashSet<SlackUserId>,
    lookups: Mutex<Vec<String>>,
    sent: Mutex<Vec<(SlackUserId, OutboundMessage)>>,
    updates: Mutex<Vec<(MessageRef, OutboundMessage)>>,
    responses: Mutex<Vec<(String, OutboundMessage)>>,
}

impl RecordingSlack {
    /// Directory knowing the given `(email, user id)` pairs.
    #[must_use]
    pub fn with_users(users: &[(&str, &str)]) -> Self {
        Self {
            users: users
                .iter()
                .map(|(email, id)| ((*email).to_string(), SlackUserId::new(*id)))
                .collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_profile(mut self, id: &str, profile: UserProfile) -> Self {
        self.profiles.insert(SlackUserId::new(id), profile);
        self
    }

    /// Give a user a real name for attribution.
    #[must_use]
    pub fn with_real_name(self, id: &str, real_name: &str) -> Self {
        self.with_profile(
            id,
            UserProfile {
                real_name: Some(real_name.to_string()),
                ..UserProfile::default()
            },
        )
    }

    /// Make direct messages to a user fail.
    #[must_use]
    pub fn failing_for(mut self, id: &str) -> Self {
        self.failing_recipients.insert(SlackUserId::new(id));
        self
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }

    pub fn sent(&self) -> Vec<(SlackUserId, OutboundMessage)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn updates(&self) -> Vec<(MessageRef, OutboundMessage)> {
        self.updates.lock().unwrap().clone()
    }

    pub fn responses(&self) -> Vec<(String, OutboundMessage)> {
        self.responses.lock().unwrap().clone()
    }
}

#[async_trait]
impl IdentityDirectory for RecordingSlack {
    async fn resolve(&self, address: &Email) -> Result<SlackUserId, SlackError> {
        self.lookups.lock().unwrap().push(address.to_string());
        self.users
            .get(address.as_str())
            .cloned()
            .ok_or_else(|| SlackError::UserNotFound(address.to_string()))
    }
}

#[async_trait]
impl Messenger for RecordingSlack {
    async fn send(
        &self,
        recipient: &SlackUserId,
        message: &OutboundMessage,
    ) -> Result<MessageRef, SlackError> {
        if self.failing_recipients.contains(recipient) {
            return Err(SlackError::Api("channel_not_found".to_string()));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push((recipient.clone(), message.clone()));
        Ok(MessageRef::new(
            format!("D{recipient}"),
            format!("{}.000100", 1_700_000_000 + sent.len()),
        ))
    }

    async fn update(&self, target: &MessageRef, message: &OutboundMessage) -> Result<(), SlackError> {
        self.updates
            .lock()
            .unwrap()
            .push((target.clone(), message.clone()));
        Ok(())
    }

    async fn fetch_profile(&self, user: &SlackUserId) -> Result<UserProfile, SlackError> {
        self.profiles
            .get(user)
            .cloned()
            .ok_or_else(|| SlackError::Api("user_not_found".to_string()))
    }

    async fn respond(&self, response_url: &str, message: &OutboundMessage) -> Result<(), SlackError> {
        self.responses
            .lock()
            .unwrap()
            .push((response_url.to_string(), message.clone()));
        Ok(())
    }
}

// =============================================================================
// Jira
// =============================================================================

/// Jira stand-in that applies each `(ticket, transition)` once and answers
/// repeats with a conflict, like a workflow that has already moved on.
#[derive(Default)]
pub struct RecordingJira {
    issues: HashMap<String, IssueFields>,
    pending: Vec<IssueSummary>,
    transition_failure: Option<String>,
    applied: Mutex<HashSet<(TicketKey, TransitionId)>>,
    issue_lookups: AtomicUsize,
    transitions: Mutex<Vec<(TicketKey, TransitionId)>>,
    comments: Mutex<Vec<(TicketKey, String)>>,
    searches: Mutex<Vec<(String, usize)>>,
}

impl RecordingJira {
    /// Tracker whose transitions all fail with a server error.
    #[must_use]
    pub fn failing_transitions(reason: &str) -> Self {
        Self {
            transition_failure: Some(reason.to_string()),
            ..Self::default()
        }
    }

    /// Register an issue returned by `get_issue`.
    #[must_use]
    pub fn with_issue(mut self, key: &str, summary: &str) -> Self {
        self.issues.insert(
            key.to_string(),
            IssueFields {
                summary: summary.to_string(),
                ..IssueFields::default()
            },
        );
        self
    }

    /// Issues returned by every search.
    #[must_use]
    pub fn with_pending(mut self, issues: &[(&str, &str)]) -> Self {
        self.pending = issues
            .iter()
            .map(|(key, summary)| IssueSummary {
                key: (*key).to_string(),
                summary: (*summary).to_string(),
                status: Some("Waiting for approval".to_string()),
            })
            .collect();
        self
    }

    pub fn issue_lookups(&self) -> usize {
        self.issue_lookups.load(Ordering::SeqCst)
    }

    pub fn transitions(&self) -> Vec<(TicketKey, TransitionId)> {
        self.transitions.lock().unwrap().clone()
    }

    pub fn comments(&self) -> Vec<(TicketKey, String)> {
        self.comments.lock().unwrap().clone()
    }

    pub fn searches(&self) -> Vec<(String, usize)> {
        self.searches.lock().unwrap().clone()
    }

    /// Total number of calls received.
    pub fn calls(&self) -> usize {
        self.issue_lookups()
            + self.transitions.lock().unwrap().len()
            + self.comments.lock().unwrap().len()
            + self.searches.lock().unwrap().len()
    }
}

#[async_trait]
impl IssueTracker for RecordingJira {
    async fn transition(&self, key: &TicketKey, transition: TransitionId) -> Result<(), JiraError> {
        self.transitions
            .lock()
            .unwrap()
            .push((key.clone(), transition));
        if let Some(reason) = &self.transition_failure {
            return Err(JiraError::Api {
                status: 500,
                message: reason.clone(),
            });
        }
        if self.applied.lock().unwrap().insert((key.clone(), transition)) {
            Ok(())
        } else {
            Err(JiraError::Conflict(format!(
                "Transition id '{transition}' is not valid for this issue."
            )))
        }
    }

    async fn add_comment(&self, key: &TicketKey, body: &str) -> Result<(), JiraError> {
        self.comments
            .lock()
            .unwrap()
            .push((key.clone(), body.to_string()));
        Ok(())
    }

    async fn get_issue(&self, key: &TicketKey) -> Result<IssueFields, JiraError> {
        self.issue_lookups.fetch_add(1, Ordering::SeqCst);
        self.issues
            .get(key.as_str())
            .cloned()
            .ok_or_else(|| JiraError::NotFound(key.to_string()))
    }

    async fn search(&self, jql: &str, limit: usize) -> Result<Vec<IssueSummary>, JiraError> {
        self.searches.lock().unwrap().push((jql.to_string(), limit));
        Ok(self.pending.iter().take(limit).cloned().collect())
    }
}
