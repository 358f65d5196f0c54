//! Prompt storage MCP server library.
//!
//! Provides the [`server::PromptStoreMcpServer`] handler, the tool parameter types and the
//! command-line configuration used by the `prompt-store-mcp` binary. Exported so the
//! protocol tests can drive the real server over an in-memory transport.

pub mod cli;
pub mod server;
pub mod tools;
