//! In-process backend.
//!
//! Holds both tables behind one mutex so every operation, the session upsert
//! included, is a single critical section. Failure switches let callers
//! exercise the error paths of code built on [`PromptStore`].

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use super::PromptStore;
use crate::error::{StoreError, StoreResult};
use crate::models::{NewPrompt, PromptRecord, SessionRecord};

#[derive(Debug, Default)]
struct Tables {
    prompts: Vec<PromptRecord>,
    sessions: Vec<SessionRecord>,
}

/// [`PromptStore`] keeping rows in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    session_writes: AtomicUsize,
    fail_sessions: AtomicBool,
    fail_prompts: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Make every session upsert fail until switched off.
    pub fn fail_sessions(&self, fail: bool) {
        self.fail_sessions.store(fail, Ordering::SeqCst);
    }

    /// Make every prompt insert and completion fail until switched off.
    pub fn fail_prompts(&self, fail: bool) {
        self.fail_prompts.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of the prompt rows in insertion order.
    pub fn prompts(&self) -> Vec<PromptRecord> {
        self.tables().prompts.clone()
    }

    /// Snapshot of the session rows in creation order.
    pub fn sessions(&self) -> Vec<SessionRecord> {
        self.tables().sessions.clone()
    }

    pub fn prompt(&self, id: &str) -> Option<PromptRecord> {
        self.tables().prompts.iter().find(|p| p.id == id).cloned()
    }

    pub fn session(&self, session_id: &str) -> Option<SessionRecord> {
        self.tables()
            .sessions
            .iter()
            .find(|s| s.session_id == session_id)
            .cloned()
    }

    /// Number of successful session writes (inserts and refreshes).
    pub fn session_writes(&self) -> usize {
        self.session_writes.load(Ordering::SeqCst)
    }

    fn injected(flag: &AtomicBool, table: &str) -> StoreResult<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::api_error(
                503,
                None,
                format!("{table} table unavailable"),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl PromptStore for MemoryStore {
    async fn upsert_session(
        &self,
        session_id: &str,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<SessionRecord> {
        Self::injected(&self.fail_sessions, "sessions")?;

        let mut tables = self.tables();
        let record = match tables
            .sessions
            .iter_mut()
            .find(|s| s.session_id == session_id)
        {
            Some(existing) => {
                existing.updated_at = Some(updated_at);
                existing.clone()
            }
            None => {
                let created = SessionRecord {
                    session_id: session_id.to_string(),
                    alias: None,
                    updated_at: Some(updated_at),
                    created_at: Some(updated_at),
                };
                tables.sessions.push(created.clone());
                created
            }
        };
        self.session_writes.fetch_add(1, Ordering::SeqCst);
        Ok(record)
    }

    async fn insert_prompt(&self, prompt: &NewPrompt) -> StoreResult<PromptRecord> {
        Self::injected(&self.fail_prompts, "prompts")?;

        let record = PromptRecord {
            id: Uuid::new_v4().to_string(),
            text: prompt.text.clone(),
            metadata: prompt.metadata.clone().map(Value::Object),
            path: prompt.path.clone(),
            model: prompt.model.clone(),
            session_id: prompt.session_id.clone(),
            completed_at: None,
            created_at: Some(Utc::now()),
        };
        self.tables().prompts.push(record.clone());
        Ok(record)
    }

    async fn complete_prompt(&self, id: &str, completed_at: DateTime<Utc>) -> StoreResult<u64> {
        Self::injected(&self.fail_prompts, "prompts")?;

        let mut tables = self.tables();
        let mut affected = 0;
        for prompt in tables.prompts.iter_mut().filter(|p| p.id == id) {
            prompt.completed_at = Some(completed_at);
            affected += 1;
        }
        Ok(affected)
    }
}
