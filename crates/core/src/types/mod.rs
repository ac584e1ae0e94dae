//! Core types for Approval Relay.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod ticket;

pub use email::{Email, EmailError};
pub use id::*;
pub use ticket::{Decision, TicketKey, TicketKeyError, TransitionId};
