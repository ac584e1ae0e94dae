//! Rewrites approval requests once a decision is in.

use std::sync::Arc;

use approval_relay_core::{ActionToken, MessageRef};
use tracing::{debug, instrument};

use super::executor::TransitionOutcome;
use crate::slack::messages::{build_failure_message, build_outcome_message};
use crate::slack::{Messenger, SlackError};

/// Replaces a request message with its outcome, removing the buttons.
#[derive(Clone)]
pub struct OutcomeReporter {
    messenger: Arc<dyn Messenger>,
}

impl OutcomeReporter {
    #[must_use]
    pub fn new(messenger: Arc<dyn Messenger>) -> Self {
        Self { messenger }
    }

    /// Show the decision in place of the request.
    ///
    /// # Errors
    ///
    /// Returns error if the message update fails.
    #[instrument(skip(self, outcome, url), fields(target = %target))]
    pub async fn report(
        &self,
        target: &MessageRef,
        outcome: &TransitionOutcome,
        url: &str,
    ) -> Result<(), SlackError> {
        let message = build_outcome_message(outcome, url);
        self.messenger.update(target, &message).await?;
        debug!("Outcome reported");
        Ok(())
    }

    /// Show that the decision could not be applied.
    ///
    /// # Errors
    ///
    /// Returns error if the message update fails.
    #[instrument(skip(self, token, reason), fields(target = %target))]
    pub async fn report_failure(
        &self,
        target: &MessageRef,
        token: &ActionToken,
        reason: &str,
    ) -> Result<(), SlackError> {
        let message = build_failure_message(&token.ticket_key, &token.url, token.decision, reason);
        self.messenger.update(target, &message).await?;
        debug!("Failure reported");
        Ok(())
    }
}
