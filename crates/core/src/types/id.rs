//! Newtype IDs for Slack entity references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing a user ID with a channel ID or a message timestamp.

use serde::{Deserialize, Serialize};

/// Macro to define a type-safe, string-backed ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`
/// - Conversion methods: `new()`, `as_str()`
/// - `From<String>`, `From<&str>` and `Display` implementations
///
/// # Example
///
/// ```rust
/// # use approval_relay_core::define_id;
/// define_id!(TeamId);
/// define_id!(AppId);
///
/// let team = TeamId::new("T123");
/// let app = AppId::new("T123");
///
/// // These are different types, so this won't compile:
/// // let _: TeamId = app;
/// assert_eq!(team.as_str(), app.as_str());
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }
    };
}

define_id!(SlackUserId);
define_id!(ChannelId);
define_id!(MessageTs);

/// Coordinates of a posted Slack message.
///
/// Slack identifies a message by the channel it lives in plus its `ts`
/// timestamp; both are needed to update it later.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    /// Channel (or DM conversation) ID.
    pub channel: ChannelId,
    /// Message timestamp.
    pub ts: MessageTs,
}

impl MessageRef {
    /// Create message coordinates.
    #[must_use]
    pub fn new(channel: impl Into<ChannelId>, ts: impl Into<MessageTs>) -> Self {
        Self {
            channel: channel.into(),
            ts: ts.into(),
        }
    }
}

impl core::fmt::Display for MessageRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{}", self.channel, self.ts)
    }
}
