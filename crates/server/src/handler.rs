//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::state::AppState;
use crate::tools::heartbeat::heartbeat_impl;
use crate::tools::metadata::{MetadataParams, metadata_impl};
use crate::tools::recommendations::recommendations_impl;

use linkmeta_core::ProviderKind;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for linkmeta.
#[derive(Clone)]
pub struct LinkmetaServer {
    state: Arc<AppState>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl LinkmetaServer {
    /// Create a new server handler.
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state, tool_router: Self::tool_router() }
    }

    /// Look up page metadata through the Embedly extract API.
    #[tool(
        description = "Get Embedly metadata for up to 25 URLs. Returns cached records only; uncached URLs are fetched in the background, so call again later for them."
    )]
    async fn metadata_extract(&self, params: Parameters<MetadataParams>) -> Result<CallToolResult, McpError> {
        metadata_impl(&self.state, ProviderKind::Embedly, params.0).await
    }

    /// Look up page metadata through the Mozilla page-metadata service.
    #[tool(
        description = "Get page metadata (title, description, favicon, largest image) for up to 25 URLs. Returns cached records only; uncached URLs are fetched in the background, so call again later for them."
    )]
    async fn metadata_page(&self, params: Parameters<MetadataParams>) -> Result<CallToolResult, McpError> {
        metadata_impl(&self.state, ProviderKind::Mozilla, params.0).await
    }

    #[tool(description = "Get the current list of recommended URLs. Empty while the list is being refreshed.")]
    async fn recommendations(&self) -> Result<CallToolResult, McpError> {
        recommendations_impl(&self.state).await
    }

    #[tool(description = "Check store connectivity and report the number of queued fetch jobs.")]
    async fn heartbeat(&self) -> Result<CallToolResult, McpError> {
        heartbeat_impl(&self.state).await
    }
}

impl ServerHandler for LinkmetaServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "linkmeta".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
