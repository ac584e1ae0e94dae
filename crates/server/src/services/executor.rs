//! Interactive decision processing.
//!
//! Slack expects an answer to an interaction within three seconds, while a
//! decision needs several round trips (profile lookup, Jira transition,
//! comment, message rewrite). The route therefore acknowledges first and
//! hands the event to [`TransitionExecutor::spawn`], which waits on an
//! [`AckGate`] until the acknowledgment response has left the handler
//! before touching any collaborator.
//!
//! The same click can be delivered more than once. The tracker rejects a
//! transition that no longer applies, and that rejection is treated as
//! "already done": the comment is skipped but the message is still
//! rewritten. An optional in-process cache suppresses repeats within a
//! window without calling Jira at all.

use std::sync::Arc;
use std::time::Duration;

use approval_relay_core::{
    ActionToken, Decision, MessageRef, MessageTs, SlackUserId, TicketKey, TransitionId,
};
use chrono::{DateTime, Utc};
use moka::future::Cache;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{Instrument, Span, debug, error, field, info, info_span, warn};
use uuid::Uuid;

use super::reporter::OutcomeReporter;
use crate::jira::IssueTracker;
use crate::slack::{InteractionPayload, Messenger, SlackError};

/// Upper bound on remembered decisions.
const DEDUP_CAPACITY: u64 = 10_000;

/// Whether a transition was performed by this event or earlier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    /// This event changed the ticket.
    Applied,
    /// The ticket had already been decided before this event.
    AlreadyApplied,
}

/// Result of a processed decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutcome {
    pub ticket_key: TicketKey,
    pub decision: Decision,
    /// Human-readable name of the approver.
    pub actor: String,
    pub timestamp: DateTime<Utc>,
    pub status: OutcomeStatus,
}

/// Lifecycle of one interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionState {
    Pending,
    Processing,
    /// Every step succeeded.
    Completed(TransitionOutcome),
    /// Processing stopped or a step failed.
    Failed(String),
}

impl ActionState {
    /// Whether processing has finished.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Failed(_))
    }
}

/// A decision click extracted from an interaction envelope.
#[derive(Debug, Clone)]
pub struct InteractionEvent {
    /// Who clicked.
    pub actor: SlackUserId,
    /// Message the button lives in, as reported by Slack.
    pub origin: Option<MessageRef>,
    /// Encoded [`ActionToken`] from the button value.
    pub token: String,
}

impl InteractionEvent {
    /// Extract the decision click from an envelope.
    ///
    /// Returns `Ok(None)` for interactions that are not decisions (link
    /// buttons and other controls).
    ///
    /// # Errors
    ///
    /// Returns [`SlackError::InvalidPayload`] if the envelope has no action
    /// or a decision button carries no value.
    pub fn from_payload(payload: &InteractionPayload) -> Result<Option<Self>, SlackError> {
        let action = payload
            .actions
            .first()
            .ok_or_else(|| SlackError::InvalidPayload("No actions in payload".to_string()))?;

        if !Decision::ALL.iter().any(|d| d.as_str() == action.action_id) {
            debug!(action_id = %action.action_id, "Ignoring non-decision action");
            return Ok(None);
        }

        let token = action
            .value
            .clone()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| SlackError::InvalidPayload("Decision action has no value".to_string()))?;

        Ok(Some(Self {
            actor: SlackUserId::new(payload.user.id.clone()),
            origin: payload.origin(),
            token,
        }))
    }
}

/// Held by the acknowledgment response; dropping it opens the gate.
#[derive(Clone)]
pub struct AckSignal(#[allow(dead_code)] Arc<oneshot::Sender<()>>);

impl std::fmt::Debug for AckSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AckSignal")
    }
}

/// Waits for the matching [`AckSignal`] to be dropped.
#[derive(Debug)]
pub struct AckGate(oneshot::Receiver<()>);

impl AckGate {
    /// Resolve once every clone of the signal is gone.
    pub async fn released(self) {
        // Nothing is ever sent; the sender closing is the release.
        let _ = self.0.await;
    }
}

/// Create a linked signal/gate pair.
#[must_use]
pub fn ack_gate() -> (AckSignal, AckGate) {
    let (tx, rx) = oneshot::channel();
    (AckSignal(Arc::new(tx)), AckGate(rx))
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DedupKey {
    ticket_key: TicketKey,
    transition_id: TransitionId,
    origin_ts: Option<MessageTs>,
}

/// Executes decisions against the tracker and reports them back.
#[derive(Clone)]
pub struct TransitionExecutor {
    messenger: Arc<dyn Messenger>,
    tracker: Arc<dyn IssueTracker>,
    reporter: OutcomeReporter,
    recent: Option<Cache<DedupKey, ()>>,
}

impl TransitionExecutor {
    /// Create an executor. A zero `dedup_window` disables the cache.
    #[must_use]
    pub fn new(
        messenger: Arc<dyn Messenger>,
        tracker: Arc<dyn IssueTracker>,
        dedup_window: Duration,
    ) -> Self {
        let recent = (!dedup_window.is_zero()).then(|| {
            Cache::builder()
                .max_capacity(DEDUP_CAPACITY)
                .time_to_live(dedup_window)
                .build()
        });

        Self {
            reporter: OutcomeReporter::new(messenger.clone()),
            messenger,
            tracker,
            recent,
        }
    }

    /// Process an event in the background once the returned signal is
    /// dropped.
    ///
    /// The caller attaches the signal to its acknowledgment response.
    pub fn spawn(&self, event: InteractionEvent) -> (AckSignal, JoinHandle<ActionState>) {
        let (signal, gate) = ack_gate();
        let executor = self.clone();
        let span = info_span!(
            "decision",
            run_id = %Uuid::new_v4(),
            actor = %event.actor,
            ticket = field::Empty,
            decision = field::Empty,
        );

        let handle = tokio::spawn(
            async move {
                debug!(state = ?ActionState::Pending, "Waiting for acknowledgment");
                gate.released().await;
                let state = executor.execute(event).await;
                match &state {
                    ActionState::Completed(outcome) => {
                        info!(status = ?outcome.status, "Decision processed");
                    }
                    ActionState::Failed(reason) => warn!(reason = %reason, "Decision failed"),
                    ActionState::Pending | ActionState::Processing => {}
                }
                state
            }
            .instrument(span),
        );

        (signal, handle)
    }

    /// Process an event now, returning its terminal state.
    pub async fn execute(&self, event: InteractionEvent) -> ActionState {
        debug!(state = ?ActionState::Processing, "Processing decision");

        let token = match ActionToken::decode(&event.token) {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Dropping interaction with malformed token");
                return ActionState::Failed(e.to_string());
            }
        };

        let span = Span::current();
        span.record("ticket", field::display(&token.ticket_key));
        span.record("decision", token.decision.as_str());

        let target = token.origin.clone().or(event.origin);
        let actor = self.attribution(&event.actor).await;
        let key = DedupKey {
            ticket_key: token.ticket_key.clone(),
            transition_id: token.transition_id,
            origin_ts: target.as_ref().map(|t| t.ts.clone()),
        };

        let status = if self.claim(&key).await {
            match self
                .tracker
                .transition(&token.ticket_key, token.transition_id)
                .await
            {
                Ok(()) => OutcomeStatus::Applied,
                Err(e) if e.is_conflict() => {
                    info!("Transition already applied");
                    OutcomeStatus::AlreadyApplied
                }
                Err(e) => {
                    error!(error = %e, "Transition failed");
                    self.release(&key).await;
                    let reason = e.to_string();
                    if let Some(target) = &target {
                        if let Err(e) = self.reporter.report_failure(target, &token, &reason).await {
                            warn!(error = %e, "Failed to update Slack message");
                        }
                    }
                    return ActionState::Failed(reason);
                }
            }
        } else {
            info!("Duplicate interaction suppressed");
            OutcomeStatus::AlreadyApplied
        };

        let outcome = TransitionOutcome {
            ticket_key: token.ticket_key.clone(),
            decision: token.decision,
            actor,
            timestamp: Utc::now(),
            status,
        };

        let mut failures = Vec::new();

        if status == OutcomeStatus::Applied {
            let comment = attribution_comment(&outcome);
            if let Err(e) = self.tracker.add_comment(&outcome.ticket_key, &comment).await {
                warn!(error = %e, "Failed to add Jira comment");
                failures.push(format!("comment: {e}"));
            }
        }

        match &target {
            Some(target) => {
                if let Err(e) = self.reporter.report(target, &outcome, &token.url).await {
                    warn!(error = %e, "Failed to update Slack message");
                    failures.push(format!("message update: {e}"));
                }
            }
            None => {
                warn!("No message coordinates, skipping message update");
                failures.push("message update: no message coordinates".to_string());
            }
        }

        if failures.is_empty() {
            ActionState::Completed(outcome)
        } else {
            ActionState::Failed(failures.join("; "))
        }
    }

    /// Display name for the acting user, falling back to the raw ID.
    async fn attribution(&self, user: &SlackUserId) -> String {
        match self.messenger.fetch_profile(user).await {
            Ok(profile) => profile.attribution(user),
            Err(e) => {
                warn!(error = %e, "Failed to fetch Slack profile");
                user.to_string()
            }
        }
    }

    /// Record the decision as in flight. Returns `false` if it already was.
    async fn claim(&self, key: &DedupKey) -> bool {
        match &self.recent {
            Some(cache) => cache.entry(key.clone()).or_insert(()).await.is_fresh(),
            None => true,
        }
    }

    async fn release(&self, key: &DedupKey) {
        if let Some(cache) = &self.recent {
            cache.invalidate(key).await;
        }
    }
}

/// Comment appended to the ticket when a decision is applied.
#[must_use]
pub fn attribution_comment(outcome: &TransitionOutcome) -> String {
    format!(
        "{} by {} via Slack at {}",
        outcome.decision.past_tense(),
        outcome.actor,
        outcome.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    )
}
