//! heartbeat tool implementation.
//!
//! Reports store connectivity and the number of queued fetch jobs.

use linkmeta_core::Error;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Output from the heartbeat tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HeartbeatOutput {
    /// Whether the store answered a ping.
    pub ok: bool,
    /// Jobs waiting to be claimed, if the store is reachable.
    pub pending_jobs: Option<u64>,
}

pub async fn heartbeat_impl(state: &AppState) -> Result<CallToolResult, McpError> {
    let output = match state.db.ping().await {
        Ok(()) => {
            state.metrics.incr("heartbeat_pass");
            HeartbeatOutput { ok: true, pending_jobs: state.db.count_jobs().await.ok() }
        }
        Err(e) => {
            tracing::error!(error = %e, "store ping failed");
            state.metrics.incr("heartbeat_fail");
            HeartbeatOutput { ok: false, pending_jobs: None }
        }
    };

    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize heartbeat: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
