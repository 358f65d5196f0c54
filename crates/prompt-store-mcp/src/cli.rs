//! Command-line interface and environment resolution.
//!
//! Flags win over environment variables; environment variables may come from
//! the process or from the dotenv file named by `--env-file`.

use std::path::{Path, PathBuf};

use clap::Parser;
use prompt_store::config::DEFAULT_REQUEST_TIMEOUT_MS;
use prompt_store::{ConfigError, StoreConfig};
use secrecy::SecretString;
use tracing::debug;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

pub const DATABASE_URL_ENV: &str = "SUPABASE_URL";
pub const DATABASE_KEY_ENV: &str = "SUPABASE_ANON_KEY";
pub const REQUEST_TIMEOUT_ENV: &str = "PROMPT_STORE_REQUEST_TIMEOUT_MS";

/// Directives used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_DIRECTIVES: &str = "prompt_store_mcp=info,prompt_store=info";

/// Log filter from `RUST_LOG`, falling back to [`DEFAULT_LOG_DIRECTIVES`].
///
/// Call after [`Cli::load_env_file`] so a `RUST_LOG` set in the dotenv file applies.
pub fn log_filter() -> Result<EnvFilter, ParseError> {
    match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::try_new(directives),
        _ => EnvFilter::try_new(DEFAULT_LOG_DIRECTIVES),
    }
}

/// MCP server that saves prompts to a hosted database.
#[derive(Debug, Parser)]
#[command(name = "prompt-store-mcp", version, about)]
pub struct Cli {
    /// Database URL (https:// REST gateway or postgres:// with sslmode=require).
    /// Falls back to SUPABASE_URL.
    #[arg(long)]
    pub database_url: Option<String>,

    /// Database credential. Falls back to SUPABASE_ANON_KEY.
    #[arg(long)]
    pub database_key: Option<String>,

    /// Per-request timeout in milliseconds. Falls back to
    /// PROMPT_STORE_REQUEST_TIMEOUT_MS, then 30000.
    #[arg(long)]
    pub request_timeout_ms: Option<u64>,

    /// Dotenv file loaded before reading the environment. A missing file is ignored.
    #[arg(long, default_value = ".env")]
    pub env_file: PathBuf,

    /// Emit logs as JSON lines on stderr.
    #[arg(long)]
    pub log_json: bool,
}

impl Cli {
    /// Load the dotenv file without overriding variables already set.
    ///
    /// Returns the path when a file was loaded.
    pub fn load_env_file(&self) -> Result<Option<&Path>, dotenvy::Error> {
        match dotenvy::from_path(&self.env_file) {
            Ok(()) => Ok(Some(self.env_file.as_path())),
            Err(e) if e.not_found() => {
                debug!(path = %self.env_file.display(), "No dotenv file found");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Resolve connection settings from flags and the process environment.
    pub fn store_config(&self) -> Result<StoreConfig, ConfigError> {
        self.store_config_from(|name| std::env::var(name).ok())
    }

    /// Resolve connection settings, reading variables through `lookup`.
    pub fn store_config_from<F>(&self, lookup: F) -> Result<StoreConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = self
            .database_url
            .clone()
            .or_else(|| lookup(DATABASE_URL_ENV));
        let api_key = self
            .database_key
            .clone()
            .or_else(|| lookup(DATABASE_KEY_ENV))
            .map(SecretString::from);

        let request_timeout_ms = match self.request_timeout_ms {
            Some(ms) => ms,
            None => match lookup(REQUEST_TIMEOUT_ENV) {
                Some(raw) => raw.trim().parse().map_err(|_| {
                    ConfigError::InvalidTimeout(format!("{REQUEST_TIMEOUT_ENV}='{raw}' is not a number"))
                })?,
                None => DEFAULT_REQUEST_TIMEOUT_MS,
            },
        };

        Ok(StoreConfig {
            database_url,
            api_key,
            request_timeout_ms,
        })
    }
}
