//! Slack integration for approval requests.
//!
//! This module provides:
//! - [`SlackClient`] for sending and updating messages and looking up users
//! - Block Kit types for building rich messages
//! - Message builders for requests, outcomes and the pending list
//! - Request signature verification
//!
//! # Flow
//!
//! 1. An approval request arrives; each approver gets a DM with Approve/Reject
//! 2. An approver clicks a button
//! 3. The interaction handler verifies the signature and acknowledges
//! 4. The ticket is transitioned in Jira
//! 5. The DM is rewritten with the decision and its buttons removed

mod client;
mod error;
pub mod messages;
mod signature;
mod types;

use approval_relay_core::{Email, MessageRef, SlackUserId};
use async_trait::async_trait;

pub use client::SlackClient;
pub use error::SlackError;
pub use signature::{SIGNATURE_HEADER, SignatureVerifier, TIMESTAMP_HEADER};
pub use types::{
    Accessory, ActionElement, Block, ButtonStyle, ContextElement, InteractionAction,
    InteractionPayload, InteractionUser, OutboundMessage, PlainText, SlashCommand, Text,
    UserProfile,
};

/// Maps an email address to a chat identity.
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    /// Resolve an address to a Slack user.
    ///
    /// Returns [`SlackError::UserNotFound`] when no user matches.
    async fn resolve(&self, address: &Email) -> Result<SlackUserId, SlackError>;
}

/// Sends, rewrites and attributes chat messages.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send a direct message, returning where it landed.
    async fn send(
        &self,
        recipient: &SlackUserId,
        message: &OutboundMessage,
    ) -> Result<MessageRef, SlackError>;

    /// Replace an existing message.
    async fn update(&self, target: &MessageRef, message: &OutboundMessage)
    -> Result<(), SlackError>;

    /// Fetch the profile used for attribution.
    async fn fetch_profile(&self, user: &SlackUserId) -> Result<UserProfile, SlackError>;

    /// Reply through an interaction or slash command `response_url`.
    async fn respond(&self, response_url: &str, message: &OutboundMessage)
    -> Result<(), SlackError>;
}
