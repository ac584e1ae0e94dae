//! Business logic services for the relay.
//!
//! # Services
//!
//! - `identity` - Email to Slack user resolution
//! - `dispatcher` - Approval request fan-out with pacing
//! - `executor` - Acknowledge-then-execute decision processing
//! - `reporter` - Outcome rewrite of the original request

pub mod dispatcher;
pub mod executor;
pub mod identity;
pub mod reporter;

pub use dispatcher::{
    ApprovalRequest, DispatchError, DispatchResult, NotificationDispatcher, Recipients,
};
pub use executor::{
    AckGate, AckSignal, ActionState, InteractionEvent, OutcomeStatus, TransitionExecutor,
    TransitionOutcome, ack_gate, attribution_comment,
};
pub use identity::{IdentityResolver, ResolveError};
pub use reporter::OutcomeReporter;
