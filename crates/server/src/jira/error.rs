//! Jira-related errors.

use thiserror::Error;

/// Errors that can occur when interacting with the Jira REST API.
#[derive(Debug, Error)]
pub enum JiraError {
    /// HTTP request failed.
    #[error("Jira request failed: {0}")]
    Request(String),

    /// The requested transition is no longer available, usually because it
    /// was already applied.
    #[error("Transition not applicable: {0}")]
    Conflict(String),

    /// Issue does not exist or is not visible to the API account.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid credentials.
    #[error("Unauthorized: check JIRA_EMAIL and JIRA_API_TOKEN")]
    Unauthorized,

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl JiraError {
    /// Whether the error means the transition was already applied.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

impl From<reqwest::Error> for JiraError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}
