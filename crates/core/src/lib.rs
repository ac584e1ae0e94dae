//! Approval Relay Core - Shared types library.
//!
//! This crate provides the types shared by the relay server and its tests:
//! - `server` - HTTP service bridging Jira approvals and Slack
//! - `integration-tests` - black-box tests over the HTTP router
//!
//! # Architecture
//!
//! The core crate contains only types and pure encoding logic - no I/O, no
//! HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for addresses, ticket keys and Slack IDs
//! - [`token`] - The action token carried by Slack buttons

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod token;
pub mod types;

pub use token::{ActionToken, TokenError};
pub use types::*;
