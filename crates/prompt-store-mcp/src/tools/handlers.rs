//! Request handlers behind the `save_prompt` and `complete_prompt` tools.
//!
//! Handlers never fail: every store error is folded into a [`ToolReply`]
//! flagged as an error, so the MCP call itself always succeeds. Protocol-level
//! failures (unknown tool, undecodable arguments) are raised by the router
//! before a handler runs.

use chrono::Utc;
use prompt_store::{NewPrompt, PromptStore, StoreError};
use rmcp::model::{CallToolResult, Content};
use tracing::{info, warn};

use super::helpers::{default_path, non_empty};
use super::params::{CompletePromptParams, SavePromptParams};

/// Text reply of one tool call: one or more text blocks, optionally flagged as
/// an application error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolReply {
    pub is_error: bool,
    pub blocks: Vec<String>,
}

impl ToolReply {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            is_error: false,
            blocks: vec![text.into()],
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            is_error: true,
            blocks: vec![text.into()],
        }
    }

    /// Append a further text block without changing the error flag.
    pub fn with_block(mut self, text: impl Into<String>) -> Self {
        self.blocks.push(text.into());
        self
    }

    /// The leading block, which carries the outcome message.
    pub fn text(&self) -> &str {
        self.blocks.first().map(String::as_str).unwrap_or_default()
    }
}

impl From<ToolReply> for CallToolResult {
    fn from(reply: ToolReply) -> Self {
        let content = reply.blocks.into_iter().map(Content::text).collect();
        if reply.is_error {
            CallToolResult::error(content)
        } else {
            CallToolResult::success(content)
        }
    }
}

/// Save a prompt, refreshing or creating its session first when one is given.
pub async fn save_prompt(store: &dyn PromptStore, params: SavePromptParams) -> ToolReply {
    if params.text.trim().is_empty() {
        return ToolReply::error("Error saving prompt: text must not be empty");
    }

    let session_id = non_empty(params.session_id);

    // A failed session refresh never blocks the prompt insert; it is reported
    // alongside the insert outcome instead.
    let session_warning = match &session_id {
        Some(id) => reconcile_session(store, id).await,
        None => None,
    };

    let prompt = NewPrompt::new(params.text)
        .with_metadata(params.metadata)
        .with_path(non_empty(params.path).or_else(default_path))
        .with_model(non_empty(params.model))
        .with_session_id(session_id);

    let reply = match store.insert_prompt(&prompt).await {
        Ok(record) => {
            info!(prompt_id = %record.id, session_id = ?prompt.session_id, "Saved prompt");
            ToolReply::success(format!(
                "Successfully saved prompt to database with ID: {}",
                record.id
            ))
        }
        Err(e) => {
            log_store_error("save_prompt", &e);
            ToolReply::error(format!("Error saving prompt: {e}"))
        }
    };

    match session_warning {
        Some(warning) => reply.with_block(warning),
        None => reply,
    }
}

/// Upsert the session row; returns a warning line when that failed.
async fn reconcile_session(store: &dyn PromptStore, session_id: &str) -> Option<String> {
    match store.upsert_session(session_id, Utc::now()).await {
        Ok(session) => {
            info!(session_id = %session.session_id, "Session reconciled");
            None
        }
        Err(e) => {
            log_store_error("reconcile_session", &e);
            Some(format!(
                "Warning: failed to reconcile session {session_id}: {e}"
            ))
        }
    }
}

/// Stamp `completed_at` with the current time on the given prompt.
pub async fn complete_prompt(store: &dyn PromptStore, params: CompletePromptParams) -> ToolReply {
    let id = params.id.as_str();
    if id.trim().is_empty() {
        return ToolReply::error("Error completing prompt: id must not be empty");
    }

    let completed_at = Utc::now();
    match store.complete_prompt(id, completed_at).await {
        Ok(0) => {
            warn!(prompt_id = %id, "complete_prompt matched no rows");
            ToolReply::success(format!("Successfully completed prompt {id}"))
        }
        Ok(rows) => {
            info!(prompt_id = %id, rows, %completed_at, "Completed prompt");
            ToolReply::success(format!("Successfully completed prompt {id}"))
        }
        Err(e) => {
            log_store_error("complete_prompt", &e);
            ToolReply::error(format!("Error completing prompt: {e}"))
        }
    }
}

fn log_store_error(operation: &str, error: &StoreError) {
    warn!(
        operation,
        error = %error,
        connection_failure = error.is_connection_failure(),
        "Store operation failed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use prompt_store::MemoryStore;
    use serde_json::json;

    fn save(text: &str) -> SavePromptParams {
        SavePromptParams {
            text: text.to_string(),
            metadata: None,
            path: None,
            model: None,
            session_id: None,
        }
    }

    fn id_from(reply: &ToolReply) -> String {
        reply
            .text()
            .strip_prefix("Successfully saved prompt to database with ID: ")
            .expect("success message")
            .to_string()
    }

    #[tokio::test]
    async fn test_save_prompt_without_session() {
        let store = MemoryStore::new();
        let reply = save_prompt(&store, save("hello")).await;

        assert!(!reply.is_error);
        assert_eq!(reply.blocks.len(), 1);
        let id = id_from(&reply);

        let row = store.prompt(&id).unwrap();
        assert_eq!(row.text, "hello");
        assert!(row.session_id.is_none());
        assert!(row.completed_at.is_none());
        assert!(row.metadata.is_none());
        assert!(row.model.is_none());
        assert_eq!(row.path, default_path());
        assert!(store.sessions().is_empty());
        assert_eq!(store.session_writes(), 0);
    }

    #[tokio::test]
    async fn test_save_prompt_keeps_supplied_fields() {
        let store = MemoryStore::new();
        let params = SavePromptParams {
            text: "hello".into(),
            metadata: json!({"tags": ["a"]}).as_object().cloned(),
            path: Some("/repo".into()),
            model: Some("claude".into()),
            session_id: None,
        };
        let id = id_from(&save_prompt(&store, params).await);

        let row = store.prompt(&id).unwrap();
        assert_eq!(row.metadata, Some(json!({"tags": ["a"]})));
        assert_eq!(row.path.as_deref(), Some("/repo"));
        assert_eq!(row.model.as_deref(), Some("claude"));
    }

    #[tokio::test]
    async fn test_save_prompt_empty_strings_fall_back() {
        let store = MemoryStore::new();
        let params = SavePromptParams {
            text: "hello".into(),
            metadata: None,
            path: Some(String::new()),
            model: Some(String::new()),
            session_id: Some(String::new()),
        };
        let id = id_from(&save_prompt(&store, params).await);

        let row = store.prompt(&id).unwrap();
        assert_eq!(row.path, default_path());
        assert!(row.model.is_none());
        assert!(row.session_id.is_none());
        assert!(store.sessions().is_empty());
    }

    #[tokio::test]
    async fn test_save_prompt_creates_unseen_session() {
        let store = MemoryStore::new();
        let mut params = save("hello");
        params.session_id = Some("chat-1".into());

        let id = id_from(&save_prompt(&store, params).await);

        let sessions = store.sessions();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].session_id, "chat-1");
        assert!(sessions[0].alias.is_none());
        assert_eq!(store.prompt(&id).unwrap().session_id.as_deref(), Some("chat-1"));
    }

    #[tokio::test]
    async fn test_save_prompt_refreshes_seen_session() {
        let store = MemoryStore::new();
        let earlier = Utc::now() - Duration::hours(1);
        store.upsert_session("chat-1", earlier).await.unwrap();
        store.upsert_session("chat-2", earlier).await.unwrap();
        let other = store
            .insert_prompt(&NewPrompt::new("elsewhere").with_session_id(Some("chat-2".into())))
            .await
            .unwrap();

        let mut params = save("two");
        params.session_id = Some("chat-1".into());
        let id = id_from(&save_prompt(&store, params).await);

        let refreshed = store.session("chat-1").unwrap();
        assert!(refreshed.updated_at.unwrap() > earlier);
        assert!(refreshed.alias.is_none());
        assert_eq!(store.prompt(&id).unwrap().session_id.as_deref(), Some("chat-1"));

        assert_eq!(store.session("chat-2").unwrap().updated_at, Some(earlier));
        assert_eq!(store.prompt(&other.id), Some(other));
        assert_eq!(store.sessions().len(), 2);
        assert_eq!(store.session_writes(), 3);
        assert_eq!(store.prompts().len(), 2);
    }

    #[tokio::test]
    async fn test_save_prompt_reports_session_failure_and_still_inserts() {
        let store = MemoryStore::new();
        store.fail_sessions(true);
        let mut params = save("hello");
        params.session_id = Some("chat-1".into());

        let reply = save_prompt(&store, params).await;

        assert!(!reply.is_error);
        assert_eq!(reply.blocks.len(), 2);
        assert!(reply.text().starts_with("Successfully saved prompt"));
        assert_eq!(
            reply.blocks[1],
            "Warning: failed to reconcile session chat-1: sessions table unavailable"
        );
        assert_eq!(store.prompts().len(), 1);
        assert!(store.sessions().is_empty());
    }

    #[tokio::test]
    async fn test_save_prompt_insert_failure() {
        let store = MemoryStore::new();
        store.fail_prompts(true);

        let reply = save_prompt(&store, save("hello")).await;

        assert!(reply.is_error);
        assert_eq!(reply.text(), "Error saving prompt: prompts table unavailable");
        assert!(store.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_save_prompt_rejects_blank_text() {
        let store = MemoryStore::new();
        let reply = save_prompt(&store, save("  ")).await;

        assert!(reply.is_error);
        assert!(reply.text().contains("text must not be empty"));
        assert!(store.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_complete_prompt_stamps_call_time() {
        let store = MemoryStore::new();
        let id = id_from(&save_prompt(&store, save("one")).await);
        let other = id_from(&save_prompt(&store, save("two")).await);

        let before = Utc::now();
        let reply = complete_prompt(&store, CompletePromptParams { id: id.clone() }).await;
        let after = Utc::now();

        assert!(!reply.is_error);
        assert_eq!(reply.text(), format!("Successfully completed prompt {id}"));
        let completed_at = store.prompt(&id).unwrap().completed_at.unwrap();
        assert!(completed_at >= before && completed_at <= after);
        assert!(store.prompt(&other).unwrap().completed_at.is_none());
    }

    #[tokio::test]
    async fn test_complete_prompt_twice_overwrites() {
        let store = MemoryStore::new();
        let id = id_from(&save_prompt(&store, save("one")).await);

        complete_prompt(&store, CompletePromptParams { id: id.clone() }).await;
        let first = store.prompt(&id).unwrap().completed_at.unwrap();

        let reply = complete_prompt(&store, CompletePromptParams { id: id.clone() }).await;
        let second = store.prompt(&id).unwrap().completed_at.unwrap();

        assert!(!reply.is_error);
        assert!(second >= first);
    }

    #[tokio::test]
    async fn test_complete_prompt_missing_id_still_succeeds() {
        let store = MemoryStore::new();
        let reply = complete_prompt(
            &store,
            CompletePromptParams {
                id: "does-not-exist".into(),
            },
        )
        .await;

        assert!(!reply.is_error);
        assert_eq!(reply.text(), "Successfully completed prompt does-not-exist");
    }

    #[tokio::test]
    async fn test_complete_prompt_store_failure() {
        let store = MemoryStore::new();
        store.fail_prompts(true);
        let reply = complete_prompt(&store, CompletePromptParams { id: "p".into() }).await;

        assert!(reply.is_error);
        assert_eq!(reply.text(), "Error completing prompt: prompts table unavailable");
    }

    #[tokio::test]
    async fn test_complete_prompt_passes_id_through_unchanged() {
        let store = MemoryStore::new();
        let id = id_from(&save_prompt(&store, save("one")).await);
        let padded = format!(" {id} ");

        let reply = complete_prompt(&store, CompletePromptParams { id: padded.clone() }).await;

        assert!(!reply.is_error);
        assert_eq!(reply.text(), format!("Successfully completed prompt {padded}"));
        assert!(store.prompt(&id).unwrap().completed_at.is_none());
    }

    #[tokio::test]
    async fn test_complete_prompt_rejects_blank_id() {
        let store = MemoryStore::new();
        let reply = complete_prompt(&store, CompletePromptParams { id: " ".into() }).await;
        assert!(reply.is_error);
        assert!(reply.text().contains("id must not be empty"));
    }

    #[test]
    fn test_reply_into_call_tool_result() {
        let result: CallToolResult = ToolReply::error("boom").with_block("detail").into();
        assert_eq!(result.is_error, Some(true));
        assert_eq!(result.content.len(), 2);
        assert_eq!(
            result.content[0].raw.as_text().map(|t| t.text.as_str()),
            Some("boom")
        );

        let ok: CallToolResult = ToolReply::success("fine").into();
        assert_ne!(ok.is_error, Some(true));
    }
}
