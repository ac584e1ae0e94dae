//! Address to chat identity resolution.

use std::sync::Arc;

use approval_relay_core::{Email, EmailError, SlackUserId};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::slack::{IdentityDirectory, SlackError};

/// Errors from resolving an approver address.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The address is not a usable email address.
    #[error("invalid address: {0}")]
    InvalidAddress(#[from] EmailError),

    /// No chat user is registered under the address.
    #[error("no Slack user found for {0}")]
    NotFound(String),

    /// The directory lookup failed.
    #[error("directory lookup failed: {0}")]
    Directory(SlackError),
}

/// Resolves email addresses to Slack users.
///
/// Stateless; every call goes to the directory.
#[derive(Clone)]
pub struct IdentityResolver {
    directory: Arc<dyn IdentityDirectory>,
}

impl IdentityResolver {
    /// Create a resolver backed by a directory.
    #[must_use]
    pub fn new(directory: Arc<dyn IdentityDirectory>) -> Self {
        Self { directory }
    }

    /// Resolve an address to a Slack user.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::InvalidAddress`] without a directory call if
    /// the address does not parse, [`ResolveError::NotFound`] if nobody
    /// matches.
    #[instrument(skip(self))]
    pub async fn resolve(&self, address: &str) -> Result<SlackUserId, ResolveError> {
        let email = Email::parse(address)?;
        match self.directory.resolve(&email).await {
            Ok(user) => {
                debug!(user = %user, "Resolved approver");
                Ok(user)
            }
            Err(SlackError::UserNotFound(_)) => Err(ResolveError::NotFound(email.to_string())),
            Err(e) => Err(ResolveError::Directory(e)),
        }
    }
}
