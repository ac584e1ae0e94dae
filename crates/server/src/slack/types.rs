//! Slack Block Kit and Web API types.
//!
//! These types represent the subset of the Slack Block Kit schema and
//! Web API payloads needed for approval requests and their outcomes.
//!
//! See: <https://api.slack.com/block-kit>

use approval_relay_core::{MessageRef, SlackUserId};
use serde::{Deserialize, Serialize};

/// A message ready to be posted or used as a replacement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundMessage {
    /// Plain text fallback (notifications, screen readers).
    pub text: String,
    /// Message blocks.
    pub blocks: Vec<Block>,
}

impl OutboundMessage {
    /// Create a message from fallback text and blocks.
    #[must_use]
    pub fn new(text: impl Into<String>, blocks: Vec<Block>) -> Self {
        Self {
            text: text.into(),
            blocks,
        }
    }

    /// Whether any block carries interactive controls.
    #[must_use]
    pub fn has_controls(&self) -> bool {
        self.blocks.iter().any(|block| {
            matches!(
                block,
                Block::Actions { .. }
                    | Block::Section {
                        accessory: Some(_),
                        ..
                    }
            )
        })
    }
}

/// Block Kit block types.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    /// Header block with large text.
    Header { text: PlainText },
    /// Section block with text and/or two-column fields.
    Section {
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<Text>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        fields: Vec<Text>,
        #[serde(skip_serializing_if = "Option::is_none")]
        accessory: Option<Accessory>,
    },
    /// Context block with small muted text/images.
    Context { elements: Vec<ContextElement> },
    /// Actions block with interactive elements.
    Actions {
        #[serde(skip_serializing_if = "Option::is_none")]
        block_id: Option<String>,
        elements: Vec<ActionElement>,
    },
    /// Divider block (horizontal line).
    Divider,
}

impl Block {
    /// Section with markdown text only.
    #[must_use]
    pub fn section(text: impl Into<String>) -> Self {
        Self::Section {
            text: Some(Text::mrkdwn(text)),
            fields: Vec::new(),
            accessory: None,
        }
    }

    /// Section rendered as two-column markdown fields.
    #[must_use]
    pub fn fields(fields: Vec<Text>) -> Self {
        Self::Section {
            text: None,
            fields,
            accessory: None,
        }
    }

    /// Context block with a single markdown element.
    #[must_use]
    pub fn context(text: impl Into<String>) -> Self {
        Self::Context {
            elements: vec![ContextElement::Mrkdwn { text: text.into() }],
        }
    }
}

/// Text object types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Text {
    /// Plain text (no formatting).
    PlainText { text: String, emoji: bool },
    /// Markdown text (supports formatting).
    Mrkdwn { text: String },
}

impl Text {
    /// Create a plain text object.
    #[must_use]
    pub fn plain(text: impl Into<String>) -> Self {
        Self::PlainText {
            text: text.into(),
            emoji: true,
        }
    }

    /// Create a markdown text object.
    #[must_use]
    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }
}

/// Plain text object (for headers and buttons).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlainText {
    #[serde(rename = "type")]
    pub text_type: &'static str,
    pub text: String,
    pub emoji: bool,
}

impl PlainText {
    /// Create a new plain text object.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text_type: "plain_text",
            text: text.into(),
            emoji: true,
        }
    }
}

/// Context block elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContextElement {
    /// Markdown text in context.
    Mrkdwn { text: String },
    /// Plain text in context.
    PlainText { text: String, emoji: bool },
}

/// Accessory elements for section blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Accessory {
    /// Button accessory.
    Button {
        text: PlainText,
        action_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        style: Option<ButtonStyle>,
    },
}

/// Action block elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionElement {
    /// Interactive button.
    Button {
        text: PlainText,
        action_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        style: Option<ButtonStyle>,
    },
}

/// Button style (affects color).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    /// Green primary button.
    Primary,
    /// Red danger button.
    Danger,
}

// =============================================================================
// Web API Responses
// =============================================================================

/// Envelope shared by every Web API response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the request was successful.
    pub ok: bool,
    /// Error code if not ok (e.g. `users_not_found`).
    #[serde(default)]
    pub error: Option<String>,
    /// Method-specific fields.
    #[serde(flatten)]
    pub data: T,
}

/// `chat.postMessage` / `chat.update` fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageResponse {
    /// Channel ID where the message lives.
    #[serde(default)]
    pub channel: Option<String>,
    /// Message timestamp (unique ID).
    #[serde(default)]
    pub ts: Option<String>,
}

/// `users.lookupByEmail` / `users.info` fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserResponse {
    /// The matched user.
    #[serde(default)]
    pub user: Option<SlackUser>,
}

/// Slack user object (subset).
#[derive(Debug, Clone, Deserialize)]
pub struct SlackUser {
    /// Slack user ID.
    pub id: String,
    /// Legacy username.
    #[serde(default)]
    pub name: Option<String>,
    /// Full name.
    #[serde(default)]
    pub real_name: Option<String>,
    /// Profile details.
    #[serde(default)]
    pub profile: SlackUserProfile,
}

/// Slack user profile (subset).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlackUserProfile {
    /// Full name.
    #[serde(default)]
    pub real_name: Option<String>,
    /// Preferred display name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Email address (requires `users:read.email`).
    #[serde(default)]
    pub email: Option<String>,
}

/// Profile fields used for attribution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserProfile {
    /// Full name.
    pub real_name: Option<String>,
    /// Preferred display name.
    pub display_name: Option<String>,
    /// Contact email.
    pub email: Option<String>,
}

impl UserProfile {
    /// Best human-readable name: full name, display name, email, then the
    /// raw Slack ID. Blank values are skipped.
    #[must_use]
    pub fn attribution(&self, id: &SlackUserId) -> String {
        [&self.real_name, &self.display_name, &self.email]
            .into_iter()
            .flatten()
            .map(|value| value.trim())
            .find(|value| !value.is_empty())
            .map_or_else(|| id.to_string(), ToString::to_string)
    }
}

impl From<SlackUser> for UserProfile {
    fn from(user: SlackUser) -> Self {
        Self {
            real_name: user.profile.real_name.or(user.real_name),
            display_name: user.profile.display_name,
            email: user.profile.email,
        }
    }
}

// =============================================================================
// Inbound Payloads
// =============================================================================

/// Slack interaction payload from button clicks.
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionPayload {
    /// Type of interaction (`block_actions` for buttons).
    #[serde(rename = "type")]
    pub interaction_type: String,
    /// User who triggered the interaction.
    pub user: InteractionUser,
    /// Container information.
    #[serde(default)]
    pub container: Option<InteractionContainer>,
    /// Channel where interaction occurred.
    #[serde(default)]
    pub channel: Option<InteractionChannel>,
    /// The message the clicked control belongs to.
    #[serde(default)]
    pub message: Option<InteractionMessage>,
    /// Actions that were triggered.
    #[serde(default)]
    pub actions: Vec<InteractionAction>,
    /// Response URL for updating the message.
    #[serde(default)]
    pub response_url: Option<String>,
}

impl InteractionPayload {
    /// Coordinates of the message the interaction came from, if Slack sent
    /// them.
    #[must_use]
    pub fn origin(&self) -> Option<MessageRef> {
        let container = self.container.as_ref();
        let channel = container
            .and_then(|c| c.channel_id.clone())
            .or_else(|| self.channel.as_ref().map(|c| c.id.clone()))?;
        let ts = container
            .and_then(|c| c.message_ts.clone())
            .or_else(|| self.message.as_ref().map(|m| m.ts.clone()))?;
        Some(MessageRef::new(channel, ts))
    }
}

/// User who triggered an interaction.
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionUser {
    /// Slack user ID.
    pub id: String,
    /// Username.
    #[serde(default)]
    pub username: Option<String>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
}

/// Container for the interaction.
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionContainer {
    /// Container type (e.g., "message").
    #[serde(rename = "type")]
    pub container_type: String,
    /// Message timestamp.
    #[serde(default)]
    pub message_ts: Option<String>,
    /// Channel ID.
    #[serde(default)]
    pub channel_id: Option<String>,
}

/// Channel where interaction occurred.
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionChannel {
    /// Channel ID.
    pub id: String,
}

/// Message the interaction originated from.
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionMessage {
    /// Message timestamp.
    pub ts: String,
}

/// Action that was triggered.
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionAction {
    /// Action ID (set when creating the button).
    pub action_id: String,
    /// Block ID containing this action.
    #[serde(default)]
    pub block_id: Option<String>,
    /// Value attached to the action.
    #[serde(default)]
    pub value: Option<String>,
    /// Action type.
    #[serde(rename = "type")]
    pub action_type: String,
}

/// Slash command invocation (form-encoded).
#[derive(Debug, Clone)]
pub struct SlashCommand {
    /// The command, including the slash.
    pub command: String,
    /// Text after the command.
    pub text: String,
    /// Invoking user.
    pub user_id: String,
    /// Where to send the delayed reply.
    pub response_url: String,
}
