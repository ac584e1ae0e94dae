//! Jira REST API v2 request and response types.

use serde::{Deserialize, Serialize};

/// Issue fields used to compose approval requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueFields {
    /// One-line summary.
    pub summary: String,
    /// Current workflow status name.
    pub status: Option<String>,
    /// Description in wiki markup.
    pub description: Option<String>,
}

/// Row of a search result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueSummary {
    /// Issue key (e.g. `IAM-100`).
    pub key: String,
    /// One-line summary.
    pub summary: String,
    /// Current workflow status name.
    pub status: Option<String>,
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Serialize)]
pub(crate) struct TransitionRequest {
    pub transition: TransitionRef,
}

#[derive(Debug, Serialize)]
pub(crate) struct TransitionRef {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct CommentRequest<'a> {
    pub body: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchRequest<'a> {
    pub jql: &'a str,
    pub max_results: usize,
    pub fields: [&'static str; 2],
}

#[derive(Debug, Deserialize)]
pub(crate) struct IssueResponse {
    pub key: String,
    #[serde(default)]
    pub fields: IssueFieldsResponse,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct IssueFieldsResponse {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub status: Option<StatusResponse>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusResponse {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub issues: Vec<IssueResponse>,
}

/// Error document returned with 4xx responses.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ErrorResponse {
    #[serde(default)]
    pub error_messages: Vec<String>,
    #[serde(default)]
    pub errors: std::collections::BTreeMap<String, String>,
}

impl ErrorResponse {
    /// All messages joined into one line.
    pub fn message(&self) -> String {
        self.error_messages
            .iter()
            .cloned()
            .chain(self.errors.iter().map(|(field, msg)| format!("{field}: {msg}")))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl From<IssueResponse> for IssueFields {
    fn from(issue: IssueResponse) -> Self {
        Self {
            summary: issue.fields.summary.unwrap_or_default(),
            status: issue.fields.status.map(|s| s.name),
            description: issue.fields.description,
        }
    }
}

impl From<IssueResponse> for IssueSummary {
    fn from(issue: IssueResponse) -> Self {
        Self {
            key: issue.key,
            summary: issue.fields.summary.unwrap_or_default(),
            status: issue.fields.status.map(|s| s.name),
        }
    }
}
