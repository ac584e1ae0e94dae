//! HTTP middleware and extractors for the relay.
//!
//! # Request Authentication
//!
//! - `POST /notify-approver`: bearer shared secret ([`RequireSharedSecret`])
//! - Slack callbacks: request signature when a signing secret is configured
//!   ([`VerifiedSlackBody`])
//!
//! Request tracing is applied in [`crate::app`]; the Sentry layers in `main.rs`.

pub mod auth;

pub use auth::{RequireSharedSecret, VerifiedSlackBody, constant_time_eq};
