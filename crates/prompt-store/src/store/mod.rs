//! # Prompt Store Backends
//!
//! [`PromptStore`] is the capability the MCP handlers talk to. It exposes the
//! three writes the server performs and nothing else; reads only happen as part
//! of returning the written row.
//!
//! Backends:
//! - [`RestStore`]: hosted REST gateway over HTTPS (default deployment)
//! - [`PgStore`]: direct PostgreSQL connection
//! - [`MemoryStore`]: in-process tables with identical semantics, for tests

mod memory;
mod postgres;
mod rest;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use rest::RestStore;

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::config::{Backend, ValidatedConfig};
use crate::error::StoreResult;
use crate::models::{NewPrompt, PromptRecord, SessionRecord};

/// Persistence operations behind `save_prompt` and `complete_prompt`.
#[async_trait]
pub trait PromptStore: Send + Sync + Debug {
    /// Insert the session if absent, otherwise refresh its `updated_at`.
    ///
    /// Implementations must do this atomically: two concurrent calls for the
    /// same unseen `session_id` leave exactly one row behind. A newly created
    /// row has a null `alias`; an existing row keeps its alias.
    async fn upsert_session(
        &self,
        session_id: &str,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<SessionRecord>;

    /// Insert one prompt row with a null `completed_at` and return it,
    /// including the database-assigned `id`.
    async fn insert_prompt(&self, prompt: &NewPrompt) -> StoreResult<PromptRecord>;

    /// Set `completed_at` on the prompt with the given id.
    ///
    /// Returns the number of rows affected. An id that matches nothing is not
    /// an error and yields `0`.
    async fn complete_prompt(&self, id: &str, completed_at: DateTime<Utc>) -> StoreResult<u64>;
}

/// Build the backend selected by a validated configuration.
pub async fn connect(config: &ValidatedConfig) -> StoreResult<Arc<dyn PromptStore>> {
    info!(
        backend = config.backend.kind(),
        host = config.backend.host(),
        "Connecting prompt store"
    );

    match &config.backend {
        Backend::Rest { base_url } => {
            let store = RestStore::new(base_url, &config.api_key, config.request_timeout)?;
            Ok(Arc::new(store))
        }
        Backend::Postgres { url } => {
            let store = PgStore::connect(url, &config.api_key, config.request_timeout).await?;
            Ok(Arc::new(store))
        }
    }
}
