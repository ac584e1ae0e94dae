//! Jira integration.
//!
//! # API Reference
//!
//! - Base URL: `{JIRA_BASE_URL}/rest/api/2`
//! - Authentication: basic auth with account email and API token
//! - Transitions: `POST /issue/{key}/transitions` (204 on success)

mod client;
mod error;
mod types;

use approval_relay_core::{TicketKey, TransitionId};
use async_trait::async_trait;

pub use client::JiraClient;
pub use error::JiraError;
pub use types::{IssueFields, IssueSummary};

/// Issue tracker operations the relay depends on.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Apply a workflow transition.
    ///
    /// Returns [`JiraError::Conflict`] when the transition was already
    /// applied.
    async fn transition(&self, key: &TicketKey, transition: TransitionId) -> Result<(), JiraError>;

    /// Append a comment.
    async fn add_comment(&self, key: &TicketKey, body: &str) -> Result<(), JiraError>;

    /// Fetch display fields.
    async fn get_issue(&self, key: &TicketKey) -> Result<IssueFields, JiraError>;

    /// Run a JQL query, returning at most `limit` issues.
    async fn search(&self, jql: &str, limit: usize) -> Result<Vec<IssueSummary>, JiraError>;
}
