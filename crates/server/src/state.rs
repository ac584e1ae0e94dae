//! Application state shared across handlers.

use std::sync::Arc;

use thiserror::Error;

use crate::config::RelayConfig;
use crate::jira::{IssueTracker, JiraClient, JiraError};
use crate::services::{NotificationDispatcher, TransitionExecutor};
use crate::slack::{IdentityDirectory, Messenger, SignatureVerifier, SlackClient, SlackError};

/// Errors building the application state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to create Slack client: {0}")]
    Slack(#[from] SlackError),
    #[error("failed to create Jira client: {0}")]
    Jira(#[from] JiraError),
}

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: RelayConfig,
    messenger: Arc<dyn Messenger>,
    tracker: Arc<dyn IssueTracker>,
    dispatcher: NotificationDispatcher,
    executor: TransitionExecutor,
    verifier: Option<SignatureVerifier>,
}

impl AppState {
    /// Build the state with the real Slack and Jira clients.
    ///
    /// # Errors
    ///
    /// Returns error if an HTTP client cannot be built.
    pub fn new(config: RelayConfig) -> Result<Self, StateError> {
        let slack = Arc::new(SlackClient::new(&config.slack, config.http_timeout)?);
        let jira = Arc::new(JiraClient::new(&config.jira, config.http_timeout)?);
        Ok(Self::from_parts(config, slack.clone(), slack, jira))
    }

    /// Build the state around arbitrary collaborators.
    #[must_use]
    pub fn from_parts(
        config: RelayConfig,
        directory: Arc<dyn IdentityDirectory>,
        messenger: Arc<dyn Messenger>,
        tracker: Arc<dyn IssueTracker>,
    ) -> Self {
        let dispatcher =
            NotificationDispatcher::new(&config, directory, messenger.clone(), tracker.clone());
        let executor =
            TransitionExecutor::new(messenger.clone(), tracker.clone(), config.dedup_window);
        let verifier = config
            .slack
            .signing_secret
            .clone()
            .map(SignatureVerifier::new);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                messenger,
                tracker,
                dispatcher,
                executor,
                verifier,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &RelayConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn messenger(&self) -> &Arc<dyn Messenger> {
        &self.inner.messenger
    }

    #[must_use]
    pub fn tracker(&self) -> &Arc<dyn IssueTracker> {
        &self.inner.tracker
    }

    #[must_use]
    pub fn dispatcher(&self) -> &NotificationDispatcher {
        &self.inner.dispatcher
    }

    #[must_use]
    pub fn executor(&self) -> &TransitionExecutor {
        &self.inner.executor
    }

    /// Verifier for Slack callbacks, if a signing secret is configured.
    #[must_use]
    pub fn signature_verifier(&self) -> Option<&SignatureVerifier> {
        self.inner.verifier.as_ref()
    }
}
