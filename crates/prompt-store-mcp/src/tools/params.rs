//! Parameter structs for the MCP tools.

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Map, Value};

// ── save_prompt ──

/// Parameters for the `save_prompt` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SavePromptParams {
    /// Prompt text.
    #[schemars(description = "Text prompt to save to database")]
    pub text: String,
    /// Free-form metadata stored alongside the prompt.
    #[schemars(description = "Optional metadata to store with the prompt")]
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
    /// Working directory the prompt was issued from (server cwd if omitted).
    #[schemars(description = "Current working directory path")]
    #[serde(default)]
    pub path: Option<String>,
    /// Model the prompt was sent to.
    #[schemars(description = "AI model name used for the prompt")]
    #[serde(default)]
    pub model: Option<String>,
    /// Chat session grouping key.
    #[schemars(description = "UUID to group related prompts from the same chat session")]
    #[serde(default)]
    pub session_id: Option<String>,
}

// ── complete_prompt ──

/// Parameters for the `complete_prompt` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CompletePromptParams {
    /// Identifier returned by `save_prompt`.
    #[schemars(description = "UUID of the prompt to mark as completed")]
    pub id: String,
}
