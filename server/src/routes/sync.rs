use axum::{
    extract::{Path, State},
    Json,
};

use crate::{error::AppJsonResult, pipeline::types::PollResult, ServerState};

/// Entry point for the external scheduler. One cycle per call; the result
/// carries mailbox-level success and isolated per-message errors.
pub async fn poll_mailbox(
    State(state): State<ServerState>,
    Path(mailbox_id): Path<String>,
) -> AppJsonResult<PollResult> {
    let result = state.pipeline.poll_mailbox(&mailbox_id).await;
    Ok(Json(result))
}

/// Operator-triggered sync. Same cycle, different trigger source.
pub async fn manual_sync(
    State(state): State<ServerState>,
    Path(mailbox_id): Path<String>,
) -> AppJsonResult<PollResult> {
    let result = state.pipeline.manual_sync(&mailbox_id).await;
    Ok(Json(result))
}

pub async fn health() -> &'static str {
    "ok"
}
