//! Prompt Storage MCP Server
//!
//! Model Context Protocol server over stdio that saves prompts to a hosted
//! database and records when they complete.

use anyhow::Context;
use clap::Parser;
use prompt_store_mcp::cli::{log_filter, Cli};
use prompt_store_mcp::server::PromptStoreMcpServer;
use rmcp::ServiceExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Read before the subscriber exists so RUST_LOG may come from the dotenv file.
    let loaded = cli
        .load_env_file()
        .with_context(|| format!("failed to load {}", cli.env_file.display()))?;

    let filter = log_filter()?;
    // stdout carries the protocol; logs go to stderr only.
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    if let Some(path) = loaded {
        tracing::debug!(path = %path.display(), "Loaded dotenv file");
    }

    let config = match cli.store_config().and_then(|c| c.validate()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid database configuration");
            return Err(e.into());
        }
    };

    let store = prompt_store::connect(&config).await?;
    let server = PromptStoreMcpServer::new(store);
    let transport = rmcp::transport::io::stdio();

    let service = server.serve(transport).await?;
    tracing::info!("Prompt Storage MCP Server running on stdio");
    service.waiting().await?;

    Ok(())
}
