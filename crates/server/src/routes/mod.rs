//! HTTP route handlers for the relay.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//!
//! # Approval intake (bearer shared secret)
//! POST /notify-approver        - Send an approval request to approvers
//!
//! # Slack callbacks (request signature when configured)
//! POST /interactive-action     - Approve/Reject button clicks
//! POST /slash/approvals        - List tickets waiting for approval
//! ```

use axum::{Router, routing::get};

use crate::state::AppState;

pub mod commands;
pub mod notify;
pub mod slack;

/// Build all relay routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .merge(notify::router())
        .merge(slack::router())
        .merge(commands::router())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}
