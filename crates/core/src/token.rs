//! Action tokens carried by Slack buttons.
//!
//! An [`ActionToken`] is the only state that survives between sending an
//! approval request and an approver clicking one of its buttons. Slack stores
//! it as the button `value` and hands it back verbatim with the interaction,
//! possibly days later and after any number of server restarts, so the token
//! must carry the whole decision context itself.
//!
//! # Format
//!
//! ```text
//! v1.<base64url(json)>
//! ```
//!
//! The JSON uses camelCase field names. Padding is omitted so the value stays
//! URL and form safe.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Decision, MessageRef, TicketKey, TransitionId};

/// Version prefix of the current encoding.
const VERSION_PREFIX: &str = "v1.";

/// Slack rejects button values longer than this.
pub const MAX_TOKEN_LEN: usize = 2000;

/// Errors produced while encoding or decoding a token.
///
/// Every decode variant means the same thing to callers: the token is
/// malformed and must not be acted upon.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The token does not start with a known version prefix.
    #[error("malformed token: unknown version")]
    Version,

    /// The payload is not valid base64.
    #[error("malformed token: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The payload is not a valid token document.
    #[error("malformed token: {0}")]
    Json(#[source] serde_json::Error),

    /// The encoded token would not fit in a Slack button value.
    #[error("token is {len} characters, limit is {}", MAX_TOKEN_LEN)]
    TooLong {
        /// Encoded length.
        len: usize,
    },

    /// Serialization failed.
    #[error("failed to encode token: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Decision context embedded in an approve/reject button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ActionToken {
    /// Ticket the decision applies to.
    pub ticket_key: TicketKey,
    /// Jira transition to execute.
    pub transition_id: TransitionId,
    /// Decision the transition represents.
    pub decision: Decision,
    /// Message the button lives in, when known at encode time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<MessageRef>,
    /// Canonical browser URL of the ticket.
    pub url: String,
}

impl ActionToken {
    /// Encode the token into an opaque button value.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::TooLong`] if the result exceeds
    /// [`MAX_TOKEN_LEN`].
    pub fn encode(&self) -> Result<String, TokenError> {
        let json = serde_json::to_vec(self).map_err(TokenError::Encode)?;
        let encoded = format!("{VERSION_PREFIX}{}", URL_SAFE_NO_PAD.encode(json));
        if encoded.len() > MAX_TOKEN_LEN {
            return Err(TokenError::TooLong { len: encoded.len() });
        }
        Ok(encoded)
    }

    /// Decode a button value produced by [`ActionToken::encode`].
    ///
    /// # Errors
    ///
    /// Returns a [`TokenError`] if the value is not a well-formed token.
    pub fn decode(value: &str) -> Result<Self, TokenError> {
        if value.len() > MAX_TOKEN_LEN {
            return Err(TokenError::TooLong { len: value.len() });
        }
        let payload = value
            .trim()
            .strip_prefix(VERSION_PREFIX)
            .ok_or(TokenError::Version)?;
        let json = URL_SAFE_NO_PAD.decode(payload)?;
        serde_json::from_slice(&json).map_err(TokenError::Json)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample(origin: Option<MessageRef>) -> ActionToken {
        ActionToken {
            ticket_key: TicketKey::parse("IAM-100").unwrap(),
            transition_id: TransitionId::new(61),
            decision: Decision::Approve,
            origin,
            url: "https://corp.atlassian.net/browse/IAM-100".to_string(),
        }
    }

    #[test]
    fn test_decode_inverts_encode() {
        for token in [sample(None), sample(Some(MessageRef::new("C1", "111.222")))] {
            let encoded = token.encode().unwrap();
            assert!(encoded.starts_with("v1."));
            assert_eq!(ActionToken::decode(&encoded).unwrap(), token);
        }
    }

    #[test]
    fn test_encoded_token_is_button_safe() {
        let encoded = sample(Some(MessageRef::new("D0123", "1700000000.000100")))
            .encode()
            .unwrap();
        assert!(encoded.len() <= MAX_TOKEN_LEN);
        assert!(
            encoded
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        );
    }

    #[test]
    fn test_decode_rejects_unknown_version() {
        let encoded = sample(None).encode().unwrap();
        let tampered = encoded.replacen("v1.", "v2.", 1);
        assert!(matches!(
            ActionToken::decode(&tampered),
            Err(TokenError::Version)
        ));
    }

    #[test]
    fn test_decode_rejects_corrupted_payload() {
        let mut encoded = sample(None).encode().unwrap();
        encoded.truncate(encoded.len() - 5);
        encoded.push('!');
        assert!(ActionToken::decode(&encoded).is_err());
        assert!(matches!(
            ActionToken::decode("v1.@@@"),
            Err(TokenError::Base64(_))
        ));
    }

    #[test]
    fn test_decode_rejects_invalid_ticket_key() {
        let json = r#"{"ticketKey":"not a key","transitionId":61,"decision":"approve","url":"x"}"#;
        let value = format!("v1.{}", URL_SAFE_NO_PAD.encode(json));
        assert!(matches!(
            ActionToken::decode(&value),
            Err(TokenError::Json(_))
        ));
    }

    #[test]
    fn test_encode_rejects_oversized_token() {
        let mut token = sample(None);
        token.url = format!("https://corp.atlassian.net/{}", "x".repeat(MAX_TOKEN_LEN));
        assert!(matches!(token.encode(), Err(TokenError::TooLong { .. })));
    }
}
