//! Jira ticket identifiers and approval decisions.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`TicketKey`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TicketKeyError {
    /// The input is empty.
    #[error("ticket key cannot be empty")]
    Empty,
    /// The input is not of the form `PROJECT-123`.
    #[error("ticket key '{0}' must look like PROJECT-123")]
    Format(String),
}

/// A Jira issue key such as `IAM-100`.
///
/// The project part starts with an ASCII letter and contains only ASCII
/// letters, digits and underscores; the number part is a positive integer.
/// The project part is normalized to upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TicketKey(String);

impl TicketKey {
    /// Parse a ticket key.
    ///
    /// # Errors
    ///
    /// Returns [`TicketKeyError`] if the input is not a valid issue key.
    pub fn parse(s: &str) -> Result<Self, TicketKeyError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(TicketKeyError::Empty);
        }

        let format_err = || TicketKeyError::Format(s.to_string());
        let (project, number) = s.rsplit_once('-').ok_or_else(format_err)?;

        let mut chars = project.chars();
        let starts_with_letter = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
        if !starts_with_letter || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(format_err());
        }
        if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format_err());
        }
        if number.bytes().all(|b| b == b'0') {
            return Err(format_err());
        }

        Ok(Self(format!("{}-{number}", project.to_ascii_uppercase())))
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the project part of the key (`IAM` for `IAM-100`).
    #[must_use]
    pub fn project(&self) -> &str {
        self.0.rsplit_once('-').map_or("", |(project, _)| project)
    }
}

impl fmt::Display for TicketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for TicketKey {
    type Err = TicketKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TicketKey {
    type Error = TicketKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TicketKey> for String {
    fn from(key: TicketKey) -> Self {
        key.0
    }
}

/// Jira workflow transition ID (e.g. `61` for "Approve").
///
/// Jira transmits transition IDs as strings; they are numeric in practice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransitionId(u32);

impl TransitionId {
    /// Create a transition ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for TransitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for TransitionId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// The decision an approver can make on a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Sign-off granted.
    Approve,
    /// Sign-off refused.
    Reject,
}

impl Decision {
    /// All decisions, in the order their buttons are rendered.
    pub const ALL: [Self; 2] = [Self::Approve, Self::Reject];

    /// Stable identifier used as the Slack `action_id`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }

    /// Button label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Approve => "Approve",
            Self::Reject => "Reject",
        }
    }

    /// Past-tense verb used in comments and outcome messages.
    #[must_use]
    pub const fn past_tense(self) -> &'static str {
        match self {
            Self::Approve => "Approved",
            Self::Reject => "Rejected",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
