//! MCP ServerHandler implementation for prompt storage.
//!
//! Registers two tools:
//! - `save_prompt`: Save a prompt (and refresh its chat session) to the database
//! - `complete_prompt`: Stamp a saved prompt's `completed_at`
//!
//! Any other tool name is rejected by the router with a protocol error.

use std::sync::Arc;

use prompt_store::PromptStore;
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo};
use rmcp::{tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};

use crate::tools::handlers;
use crate::tools::*;

/// Name reported in the MCP `initialize` handshake.
pub const SERVER_NAME: &str = "prompt-storage-mcp-server";

/// Prompt storage MCP server handler.
///
/// Holds the store handle built once at startup; every tool call borrows it.
#[derive(Debug, Clone)]
pub struct PromptStoreMcpServer {
    tool_router: ToolRouter<Self>,
    store: Arc<dyn PromptStore>,
}

impl PromptStoreMcpServer {
    pub fn new(store: Arc<dyn PromptStore>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            store,
        }
    }
}

#[tool_handler(router = self.tool_router)]
impl ServerHandler for PromptStoreMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                title: Some("Prompt Storage MCP Server".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: Some(
                    "Saves prompts to a hosted database and records when they complete"
                        .to_string(),
                ),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Call save_prompt with the prompt text (plus optional metadata, path, model \
                 and session_id) when a prompt is issued; keep the returned ID. Call \
                 complete_prompt with that ID once the prompt has been answered. \
                 Results are plain text: check for an 'Error' prefix to detect failures."
                    .to_string(),
            ),
        }
    }
}

#[tool_router(router = tool_router)]
impl PromptStoreMcpServer {
    /// Save a prompt, creating or refreshing its chat session when `session_id` is set.
    #[tool(
        name = "save_prompt",
        description = "Save a text prompt to Supabase database with timing tracking"
    )]
    pub async fn save_prompt(
        &self,
        Parameters(params): Parameters<SavePromptParams>,
    ) -> Result<CallToolResult, McpError> {
        Ok(handlers::save_prompt(self.store.as_ref(), params).await.into())
    }

    /// Mark a prompt as completed at the current time.
    #[tool(
        name = "complete_prompt",
        description = "Mark a prompt as completed and record processing time"
    )]
    pub async fn complete_prompt(
        &self,
        Parameters(params): Parameters<CompletePromptParams>,
    ) -> Result<CallToolResult, McpError> {
        Ok(handlers::complete_prompt(self.store.as_ref(), params)
            .await
            .into())
    }
}
