//! metadata_extract / metadata_page tool implementation.
//!
//! Returns whatever is cached for the requested URLs and schedules fetch
//! jobs for the rest. Callers poll: URLs missing from the output are either
//! being fetched or were rate limited.

use std::collections::HashMap;

use linkmeta_core::{Error, ProviderKind, ValidatedRecord};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::validate_urls;
use crate::state::AppState;

/// Parameters for the metadata tools.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MetadataParams {
    /// Page URLs to look up.
    pub urls: Vec<String>,
}

/// Output from the metadata tools.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MetadataOutput {
    /// Cached records keyed by requested URL.
    pub urls: HashMap<String, ValidatedRecord>,
}

/// Implementation of the metadata tools for one provider.
pub async fn metadata_impl(
    state: &AppState, kind: ProviderKind, params: MetadataParams,
) -> Result<CallToolResult, McpError> {
    validate_urls(&params.urls, state.max_request_urls)?;

    let urls = state.coordinator(kind)?.request_async(&params.urls).await?;

    let output = MetadataOutput { urls };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize metadata: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
