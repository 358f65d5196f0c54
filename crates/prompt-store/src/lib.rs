//! # prompt-store
//!
//! Persistence layer for the prompt storage MCP server: the `prompts` and
//! `sessions` row types, startup configuration, and the [`PromptStore`]
//! capability with its REST gateway, PostgreSQL and in-memory backends.
//!
//! ```no_run
//! use prompt_store::{connect, NewPrompt, PromptStore, StoreConfig};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = StoreConfig::new("https://abcd.supabase.co", "anon-key").validate()?;
//! let store = connect(&config).await?;
//! let saved = store.insert_prompt(&NewPrompt::new("hello")).await?;
//! println!("saved {}", saved.id);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod models;
pub mod store;

pub use config::{Backend, StoreConfig, ValidatedConfig};
pub use error::{ConfigError, StoreError, StoreResult};
pub use models::{NewPrompt, PromptRecord, SessionRecord};
pub use store::{connect, MemoryStore, PgStore, PromptStore, RestStore};
