//! Slack message builders for the approval flow.
//!
//! Provides factory functions for building Block Kit messages for:
//! - Approval requests with Approve/Reject buttons
//! - Decision outcomes (replace the request)
//! - Transition failures (replace the request)
//! - The pending approvals list for the slash command

use std::collections::BTreeMap;

use approval_relay_core::{Decision, TicketKey};

use super::types::{
    Accessory, ActionElement, Block, ButtonStyle, OutboundMessage, PlainText, Text,
};
use crate::jira::IssueSummary;
use crate::services::{OutcomeStatus, TransitionOutcome};

/// `block_id` of the Approve/Reject actions block.
pub const DECISION_BLOCK_ID: &str = "approval_decision";

/// `action_id` of the "Open in Jira" link button.
pub const OPEN_TICKET_ACTION_ID: &str = "open_ticket";

/// Ticket details shown in an approval request.
#[derive(Debug, Clone)]
pub struct RequestCard<'a> {
    pub ticket_key: &'a TicketKey,
    pub summary: &'a str,
    pub url: &'a str,
    pub requester: &'a str,
    pub extra_fields: &'a BTreeMap<String, String>,
}

/// Escape the characters Slack treats as control sequences in mrkdwn.
#[must_use]
pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn ticket_link(key: &TicketKey, url: &str) -> String {
    format!("<{url}|{key}>")
}

/// Build an approval request.
///
/// `approve_value` and `reject_value` are the encoded action tokens carried
/// by the buttons.
#[must_use]
pub fn build_request_message(
    card: &RequestCard<'_>,
    approve_value: &str,
    reject_value: &str,
) -> OutboundMessage {
    let mut blocks = vec![
        Block::Header {
            text: PlainText::new("🔐 Approval requested"),
        },
        Block::Section {
            text: Some(Text::mrkdwn(format!(
                "*{}*\n{}",
                ticket_link(card.ticket_key, card.url),
                escape(card.summary)
            ))),
            fields: Vec::new(),
            accessory: Some(Accessory::Button {
                text: PlainText::new("Open in Jira"),
                action_id: OPEN_TICKET_ACTION_ID.to_string(),
                url: Some(card.url.to_string()),
                value: None,
                style: None,
            }),
        },
    ];

    if !card.extra_fields.is_empty() {
        blocks.push(Block::fields(
            card.extra_fields
                .iter()
                .map(|(name, value)| {
                    Text::mrkdwn(format!("*{}:*\n{}", escape(name), escape(value)))
                })
                .collect(),
        ));
    }

    blocks.push(Block::context(format!(
        "Requested by *{}*",
        escape(card.requester)
    )));
    blocks.push(Block::Divider);
    blocks.push(Block::Actions {
        block_id: Some(DECISION_BLOCK_ID.to_string()),
        elements: vec![
            ActionElement::Button {
                text: PlainText::new(Decision::Approve.label()),
                action_id: Decision::Approve.as_str().to_string(),
                value: Some(approve_value.to_string()),
                style: Some(ButtonStyle::Primary),
            },
            ActionElement::Button {
                text: PlainText::new(Decision::Reject.label()),
                action_id: Decision::Reject.as_str().to_string(),
                value: Some(reject_value.to_string()),
                style: Some(ButtonStyle::Danger),
            },
        ],
    });

    OutboundMessage::new(
        format!(
            "Approval requested for {}: {}",
            card.ticket_key, card.summary
        ),
        blocks,
    )
}

/// Build a decision outcome (replaces the request).
///
/// A replayed or superseded click does not claim its own decision was
/// recorded: Jira only reports that the ticket had already moved on.
#[must_use]
pub fn build_outcome_message(outcome: &TransitionOutcome, url: &str) -> OutboundMessage {
    let link = ticket_link(&outcome.ticket_key, url);
    let actor = escape(&outcome.actor);
    let verb = outcome.decision.past_tense().to_lowercase();

    let (header, summary, text) = match outcome.status {
        OutcomeStatus::Applied => {
            let emoji = match outcome.decision {
                Decision::Approve => "✅",
                Decision::Reject => "❌",
            };
            (
                format!("{emoji} {}", outcome.decision.past_tense()),
                format!("*{link}* was {verb} by *{actor}*"),
                format!("{} {verb} by {}", outcome.ticket_key, outcome.actor),
            )
        }
        OutcomeStatus::AlreadyApplied => (
            "ℹ️ Already decided".to_string(),
            format!(
                "*{link}* was already decided when *{actor}* chose {}",
                outcome.decision.label()
            ),
            format!("{} was already decided", outcome.ticket_key),
        ),
    };

    let mut blocks = vec![
        Block::Header {
            text: PlainText::new(header),
        },
        Block::section(summary),
        Block::context(format!(
            "Decided {}",
            outcome.timestamp.format("%Y-%m-%d %H:%M UTC")
        )),
    ];

    if outcome.status == OutcomeStatus::AlreadyApplied {
        blocks.push(Block::context("A decision had already been recorded in Jira."));
    }

    OutboundMessage::new(text, blocks)
}

/// Build a failure notice (replaces the request).
#[must_use]
pub fn build_failure_message(
    ticket_key: &TicketKey,
    url: &str,
    decision: Decision,
    reason: &str,
) -> OutboundMessage {
    OutboundMessage::new(
        format!("Could not {} {ticket_key}", decision.as_str()),
        vec![
            Block::Header {
                text: PlainText::new("⚠️ Decision not applied"),
            },
            Block::section(format!(
                "Could not {} *{}* in Jira.",
                decision.as_str(),
                ticket_link(ticket_key, url)
            )),
            Block::Section {
                text: Some(Text::mrkdwn(format!("*Error:*\n```\n{}\n```", escape(reason)))),
                fields: Vec::new(),
                accessory: None,
            },
            Block::context("Open the ticket to decide there."),
        ],
    )
}

/// Build the pending approvals list for the slash command.
#[must_use]
pub fn build_pending_list(issues: &[IssueSummary], browse_base: &str) -> OutboundMessage {
    if issues.is_empty() {
        return OutboundMessage::new(
            "Nothing is waiting for approval.",
            vec![Block::section("🎉 Nothing is waiting for approval.")],
        );
    }

    let mut blocks = vec![Block::Header {
        text: PlainText::new(format!("⏳ Waiting for approval ({})", issues.len())),
    }];

    blocks.extend(issues.iter().map(|issue| {
        let status = issue
            .status
            .as_deref()
            .map(|s| format!(" · _{}_", escape(s)))
            .unwrap_or_default();
        Block::section(format!(
            "*<{browse_base}/browse/{key}|{key}>* {}{status}",
            escape(&issue.summary),
            key = issue.key,
        ))
    }));

    OutboundMessage::new(format!("{} tickets waiting for approval", issues.len()), blocks)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn key() -> TicketKey {
        TicketKey::parse("IAM-100").unwrap()
    }

    fn outcome(status: OutcomeStatus) -> TransitionOutcome {
        TransitionOutcome {
            ticket_key: key(),
            decision: Decision::Approve,
            actor: "Jane Doe".to_string(),
            timestamp: Utc.with_ymd_and_hms(2026, 3, 4, 9, 30, 0).unwrap(),
            status,
        }
    }

    #[test]
    fn test_request_message_carries_tokens() {
        let extra = BTreeMap::from([("Environment".to_string(), "prod".to_string())]);
        let message = build_request_message(
            &RequestCard {
                ticket_key: &key(),
                summary: "Grant <prod> access",
                url: "https://corp.atlassian.net/browse/IAM-100",
                requester: "sam@corp.io",
                extra_fields: &extra,
            },
            "v1.approve",
            "v1.reject",
        );

        assert!(message.has_controls());
        let json = serde_json::to_string(&message).unwrap();
        assert!(json.contains("v1.approve"));
        assert!(json.contains("v1.reject"));
        assert!(json.contains("Grant &lt;prod&gt; access"));
        assert!(json.contains("*Environment:*"));
        assert!(json.contains("\"block_id\":\"approval_decision\""));
    }

    #[test]
    fn test_request_message_without_extra_fields() {
        let message = build_request_message(
            &RequestCard {
                ticket_key: &key(),
                summary: "Grant prod access",
                url: "https://corp.atlassian.net/browse/IAM-100",
                requester: "sam@corp.io",
                extra_fields: &BTreeMap::new(),
            },
            "a",
            "r",
        );
        // header, summary, context, divider, actions
        assert_eq!(message.blocks.len(), 5);
    }

    #[test]
    fn test_outcome_message_has_no_controls() {
        let message = build_outcome_message(
            &outcome(OutcomeStatus::Applied),
            "https://corp.atlassian.net/browse/IAM-100",
        );
        assert!(!message.has_controls());
        assert_eq!(message.text, "IAM-100 approved by Jane Doe");
        let json = serde_json::to_string(&message).unwrap();
        assert!(json.contains("Jane Doe"));
        assert!(json.contains("2026-03-04 09:30 UTC"));
        assert!(!json.contains("already been recorded"));
    }

    #[test]
    fn test_outcome_message_notes_replay() {
        let mut replay = outcome(OutcomeStatus::AlreadyApplied);
        replay.decision = Decision::Reject;
        let message = build_outcome_message(&replay, "https://corp.atlassian.net/browse/IAM-100");
        assert!(!message.has_controls());
        assert_eq!(message.text, "IAM-100 was already decided");
        let json = serde_json::to_string(&message).unwrap();
        assert!(json.contains("A decision had already been recorded"));
        assert!(!json.contains("rejected"));
        assert!(!json.contains("Rejected"));
    }

    #[test]
    fn test_failure_message_has_no_controls() {
        let message = build_failure_message(
            &key(),
            "https://corp.atlassian.net/browse/IAM-100",
            Decision::Reject,
            "API error: 500 - boom",
        );
        assert!(!message.has_controls());
        assert_eq!(message.text, "Could not reject IAM-100");
    }

    #[test]
    fn test_pending_list() {
        let issues = vec![
            IssueSummary {
                key: "IAM-100".to_string(),
                summary: "Grant prod access".to_string(),
                status: Some("Waiting".to_string()),
            },
            IssueSummary {
                key: "IAM-101".to_string(),
                summary: "Rotate keys".to_string(),
                status: None,
            },
        ];
        let message = build_pending_list(&issues, "https://corp.atlassian.net");
        assert_eq!(message.blocks.len(), 3);
        let json = serde_json::to_string(&message).unwrap();
        assert!(json.contains("https://corp.atlassian.net/browse/IAM-101|IAM-101"));

        let empty = build_pending_list(&[], "https://corp.atlassian.net");
        assert_eq!(empty.blocks.len(), 1);
    }
}
