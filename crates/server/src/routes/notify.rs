//! Approval request intake.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::post,
};
use serde::Serialize;
use tracing::{info, instrument};

use crate::error::AppError;
use crate::middleware::RequireSharedSecret;
use crate::services::{ApprovalRequest, DispatchResult};
use crate::state::AppState;

/// Create approval intake routes.
pub fn router() -> Router<AppState> {
    Router::new().route("/notify-approver", post(notify_approver))
}

/// Response body of a completed dispatch.
#[derive(Debug, Serialize)]
pub struct NotifyResponse {
    pub ok: bool,
    pub results: Vec<DispatchResult>,
}

/// Send an approval request to every approver.
///
/// Per-recipient failures are reported in `results`; the request itself
/// only fails when nothing could be attempted.
#[instrument(skip_all)]
async fn notify_approver(
    _auth: RequireSharedSecret,
    State(state): State<AppState>,
    payload: Result<Json<ApprovalRequest>, JsonRejection>,
) -> Result<Json<NotifyResponse>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::Validation(e.body_text()))?;

    info!(ticket = %request.ticket_key, "Approval request received");
    let results = state.dispatcher().dispatch(&request).await?;

    Ok(Json(NotifyResponse { ok: true, results }))
}
