use std::sync::Arc;

use anyhow::Result;
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler, ServiceExt,
    model::{
        CallToolRequestParam, CallToolResult, Content, Implementation, ListToolsResult,
        PaginatedRequestParam, ProtocolVersion, ServerCapabilities, ServerInfo, Tool,
    },
    service::RequestContext,
    transport::stdio,
};
use tokio_util::sync::CancellationToken;

use super::metadata::all_tool_metadata;
use crate::engine::LinkEngine;
use crate::scan::{McpProgressSink, ProgressSink, SCAN_PAGE, ScanPageArgs, ScanTool};

/// MCP server exposing the `scan_page` tool
pub struct LinkScanServer<E> {
    tool: ScanTool<E>,
}

impl<E: LinkEngine> LinkScanServer<E> {
    pub fn new(tool: ScanTool<E>) -> Self {
        Self { tool }
    }

    /// Serve over stdin/stdout until the client disconnects or
    /// `shutdown_token` is cancelled
    pub async fn serve_stdio(self, shutdown_token: CancellationToken) -> Result<()> {
        log::info!("Starting stdio server");

        let service = self
            .serve_with_ct(stdio(), shutdown_token)
            .await
            .inspect_err(|e| {
                log::error!("serving error: {e:?}");
            })?;
        let reason = service.waiting().await?;

        log::info!("Stdio server stopped: {reason:?}");
        Ok(())
    }
}

impl<E: LinkEngine> ServerHandler for LinkScanServer<E> {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Implementation::from_build_env()
            },
            instructions: Some(
                "Link checker: call scan_page with a URL or local path to find broken links. Pass a progress token to receive progress notifications.".to_string(),
            ),
        }
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        if request.name != SCAN_PAGE {
            return Err(McpError::invalid_params(
                format!("Unknown tool: {}", request.name),
                None,
            ));
        }

        let args = serde_json::Value::Object(request.arguments.unwrap_or_default());
        let args: ScanPageArgs = serde_json::from_value(args).map_err(|e| {
            McpError::invalid_params(format!("Invalid arguments for {SCAN_PAGE}: {e}"), None)
        })?;

        let sink = context.meta.get_progress_token().map(|token| {
            log::debug!("Progress token for {}: {token:?}", args.path);
            Arc::new(McpProgressSink::new(context.peer.clone(), token)) as Arc<dyn ProgressSink>
        });

        let text = self.tool.execute(&args, sink).await;
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        let tools = all_tool_metadata()
            .into_iter()
            .map(|tool_meta| {
                // Convert schema Value to Arc<JsonObject>
                let schema_obj = match tool_meta.schema {
                    serde_json::Value::Object(obj) => Arc::new(obj),
                    _ => Arc::new(serde_json::Map::new()),
                };
                Tool::new(tool_meta.name, tool_meta.description, schema_obj)
            })
            .collect::<Vec<_>>();

        log::debug!("Serving {} tools", tools.len());

        Ok(ListToolsResult::with_all_items(tools))
    }
}
