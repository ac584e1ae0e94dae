//! Jira REST API v2 client.

use std::sync::Arc;
use std::time::Duration;

use approval_relay_core::{TicketKey, TransitionId};
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use super::IssueTracker;
use super::error::JiraError;
use super::types::{
    CommentRequest, ErrorResponse, IssueFields, IssueResponse, IssueSummary, SearchRequest,
    SearchResponse, TransitionRef, TransitionRequest,
};
use crate::config::JiraConfig;

/// Fragments Jira uses when a transition cannot be applied from the current
/// status.
const UNAVAILABLE_TRANSITION_MARKERS: &[&str] =
    &["not valid", "invalid", "not available", "unavailable"];

/// Jira REST API client.
///
/// Authenticates every request with the account email and API token.
#[derive(Clone)]
pub struct JiraClient {
    inner: Arc<JiraClientInner>,
}

struct JiraClientInner {
    client: reqwest::Client,
    api_base: String,
    email: String,
    api_token: SecretString,
}

impl std::fmt::Debug for JiraClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JiraClient")
            .field("api_base", &self.inner.api_base)
            .field("email", &self.inner.email)
            .field("api_token", &"[REDACTED]")
            .finish()
    }
}

impl JiraClient {
    /// Create a new Jira client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &JiraConfig, timeout: Duration) -> Result<Self, JiraError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("approval-relay/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(JiraClientInner {
                client,
                api_base: format!(
                    "{}/rest/api/2",
                    config.base_url.as_str().trim_end_matches('/')
                ),
                email: config.email.clone(),
                api_token: config.api_token.clone(),
            }),
        })
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .basic_auth(&self.inner.email, Some(self.inner.api_token.expose_secret()))
            .header("Accept", "application/json")
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.api_base)
    }

    /// Apply a workflow transition.
    ///
    /// # Errors
    ///
    /// Returns [`JiraError::Conflict`] if the transition is not available
    /// from the issue's current status.
    #[instrument(skip(self), fields(ticket = %key, transition = %transition))]
    pub async fn transition_issue(
        &self,
        key: &TicketKey,
        transition: TransitionId,
    ) -> Result<(), JiraError> {
        let body = TransitionRequest {
            transition: TransitionRef {
                id: transition.to_string(),
            },
        };
        let response = self
            .authed(self.inner.client.post(self.url(&format!("/issue/{key}/transitions"))))
            .json(&body)
            .send()
            .await?;

        if response.status().is_success() {
            debug!("Transition applied");
            return Ok(());
        }

        match self.parse_error(response).await {
            JiraError::Api { status, message }
                if status == StatusCode::CONFLICT.as_u16()
                    || (status == StatusCode::BAD_REQUEST.as_u16()
                        && is_unavailable_transition(&message)) =>
            {
                warn!(status, error = %message, "Transition not applicable");
                Err(JiraError::Conflict(message))
            }
            other => Err(other),
        }
    }

    /// Add a plain-text comment to an issue.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self, body), fields(ticket = %key))]
    pub async fn post_comment(&self, key: &TicketKey, body: &str) -> Result<(), JiraError> {
        let response = self
            .authed(self.inner.client.post(self.url(&format!("/issue/{key}/comment"))))
            .json(&CommentRequest { body })
            .send()
            .await?;

        if response.status().is_success() {
            debug!("Comment added");
            return Ok(());
        }
        Err(self.parse_error(response).await)
    }

    /// Fetch the fields used in approval messages.
    ///
    /// # Errors
    ///
    /// Returns [`JiraError::NotFound`] if the issue does not exist.
    #[instrument(skip(self), fields(ticket = %key))]
    pub async fn fetch_issue(&self, key: &TicketKey) -> Result<IssueFields, JiraError> {
        let request = self
            .inner
            .client
            .get(self.url(&format!("/issue/{key}")))
            .query(&[("fields", "summary,status,description")]);
        let issue: IssueResponse = self.handle_response(self.authed(request)).await?;
        Ok(issue.into())
    }

    /// Run a JQL search.
    ///
    /// # Errors
    ///
    /// Returns error if the query is rejected or the request fails.
    #[instrument(skip(self))]
    pub async fn search_issues(
        &self,
        jql: &str,
        limit: usize,
    ) -> Result<Vec<IssueSummary>, JiraError> {
        let request = self.inner.client.post(self.url("/search")).json(&SearchRequest {
            jql,
            max_results: limit,
            fields: ["summary", "status"],
        });
        let result: SearchResponse = self.handle_response(self.authed(request)).await?;
        debug!(count = result.issues.len(), "Search completed");
        Ok(result.issues.into_iter().map(IssueSummary::from).collect())
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, JiraError> {
        let response = request.send().await?;
        if response.status().is_success() {
            return response
                .json()
                .await
                .map_err(|e| JiraError::Parse(format!("Failed to parse response: {e}")));
        }
        Err(self.parse_error(response).await)
    }

    /// Parse error response from the Jira API.
    async fn parse_error(&self, response: Response) -> JiraError {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&text)
            .map(|e| e.message())
            .ok()
            .filter(|m| !m.is_empty())
            .unwrap_or(text);

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => JiraError::Unauthorized,
            StatusCode::NOT_FOUND => JiraError::NotFound(message),
            _ => JiraError::Api {
                status: status.as_u16(),
                message,
            },
        }
    }
}

fn is_unavailable_transition(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("transition")
        && UNAVAILABLE_TRANSITION_MARKERS
            .iter()
            .any(|marker| lower.contains(marker))
}

#[async_trait]
impl IssueTracker for JiraClient {
    async fn transition(&self, key: &TicketKey, transition: TransitionId) -> Result<(), JiraError> {
        self.transition_issue(key, transition).await
    }

    async fn add_comment(&self, key: &TicketKey, body: &str) -> Result<(), JiraError> {
        self.post_comment(key, body).await
    }

    async fn get_issue(&self, key: &TicketKey) -> Result<IssueFields, JiraError> {
        self.fetch_issue(key).await
    }

    async fn search(&self, jql: &str, limit: usize) -> Result<Vec<IssueSummary>, JiraError> {
        self.search_issues(jql, limit).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;
    use url::Url;

    use super::*;

    fn client_for(server: &MockServer) -> JiraClient {
        JiraClient::new(
            &JiraConfig {
                base_url: Url::parse(&server.base_url()).unwrap(),
                email: "bot@corp.io".to_string(),
                api_token: SecretString::from("jira-token"),
                pending_jql: "status = Waiting".to_string(),
            },
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn key() -> TicketKey {
        TicketKey::parse("IAM-100").unwrap()
    }

    #[tokio::test]
    async fn test_transition_applied() {
        let server = MockServer::start();
        let transition = server.mock(|when, then| {
            when.method(POST)
                .path("/rest/api/2/issue/IAM-100/transitions")
                .header_exists("authorization")
                .json_body(json!({"transition": {"id": "61"}}));
            then.status(204);
        });

        client_for(&server)
            .transition_issue(&key(), TransitionId::new(61))
            .await
            .unwrap();
        transition.assert_calls(1);
    }

    #[tokio::test]
    async fn test_transition_already_applied_is_conflict() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/rest/api/2/issue/IAM-100/transitions");
            then.status(400).json_body(json!({
                "errorMessages": ["Transition id '61' is not valid for this issue."],
                "errors": {}
            }));
        });

        let err = client_for(&server)
            .transition_issue(&key(), TransitionId::new(61))
            .await
            .unwrap_err();
        assert!(err.is_conflict(), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn test_transition_http_conflict() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/rest/api/2/issue/IAM-100/transitions");
            then.status(409).body("");
        });

        let err = client_for(&server)
            .transition_issue(&key(), TransitionId::new(61))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_transition_validation_error_is_not_conflict() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/rest/api/2/issue/IAM-100/transitions");
            then.status(400).json_body(json!({
                "errorMessages": [],
                "errors": {"resolution": "Resolution is required."}
            }));
        });

        let err = client_for(&server)
            .transition_issue(&key(), TransitionId::new(61))
            .await
            .unwrap_err();
        assert!(
            matches!(err, JiraError::Api { status: 400, ref message } if message.contains("Resolution"))
        );
    }

    #[tokio::test]
    async fn test_transition_unauthorized() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/rest/api/2/issue/IAM-100/transitions");
            then.status(401);
        });

        let err = client_for(&server)
            .transition_issue(&key(), TransitionId::new(61))
            .await
            .unwrap_err();
        assert!(matches!(err, JiraError::Unauthorized));
    }

    #[tokio::test]
    async fn test_add_comment() {
        let server = MockServer::start();
        let comment = server.mock(|when, then| {
            when.method(POST)
                .path("/rest/api/2/issue/IAM-100/comment")
                .json_body(json!({"body": "Approved by Jane Doe via Slack"}));
            then.status(201).json_body(json!({"id": "10000"}));
        });

        client_for(&server)
            .post_comment(&key(), "Approved by Jane Doe via Slack")
            .await
            .unwrap();
        comment.assert_calls(1);
    }

    #[tokio::test]
    async fn test_get_issue() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/rest/api/2/issue/IAM-100")
                .query_param("fields", "summary,status,description");
            then.status(200).json_body(json!({
                "key": "IAM-100",
                "fields": {
                    "summary": "Grant prod access",
                    "status": {"name": "Waiting for approval"},
                    "description": null
                }
            }));
        });

        let fields = client_for(&server).fetch_issue(&key()).await.unwrap();
        assert_eq!(fields.summary, "Grant prod access");
        assert_eq!(fields.status.as_deref(), Some("Waiting for approval"));
        assert!(fields.description.is_none());
    }

    #[tokio::test]
    async fn test_get_issue_not_found() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/rest/api/2/issue/IAM-100");
            then.status(404).json_body(json!({
                "errorMessages": ["Issue does not exist or you do not have permission to see it."]
            }));
        });

        let err = client_for(&server).fetch_issue(&key()).await.unwrap_err();
        assert!(matches!(err, JiraError::NotFound(ref msg) if msg.contains("does not exist")));
    }

    #[tokio::test]
    async fn test_search() {
        let server = MockServer::start();
        let search = server.mock(|when, then| {
            when.method(POST)
                .path("/rest/api/2/search")
                .json_body_includes(json!({"jql": "status = Waiting", "maxResults": 20}).to_string());
            then.status(200).json_body(json!({
                "issues": [
                    {"key": "IAM-100", "fields": {"summary": "Grant prod access", "status": {"name": "Waiting"}}},
                    {"key": "IAM-101", "fields": {"summary": "Rotate keys"}}
                ]
            }));
        });

        let issues = client_for(&server)
            .search_issues("status = Waiting", 20)
            .await
            .unwrap();
        search.assert_calls(1);
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].key, "IAM-100");
        assert_eq!(issues[1].status, None);
    }

    #[test]
    fn test_is_unavailable_transition() {
        assert!(is_unavailable_transition(
            "Transition id '61' is not valid for this issue."
        ));
        assert!(is_unavailable_transition("The transition is unavailable"));
        assert!(!is_unavailable_transition("Field 'resolution' is invalid"));
        assert!(!is_unavailable_transition("Resolution is required."));
    }
}
