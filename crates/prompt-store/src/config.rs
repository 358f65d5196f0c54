//! # Store Configuration
//!
//! Connection settings for the hosted database and their startup validation.
//! The URL scheme selects the backend:
//!
//! - `https://…` → REST gateway ([`RestStore`](crate::RestStore))
//! - `postgres://…` / `postgresql://…` with a TLS `sslmode` → [`PgStore`](crate::PgStore)
//!
//! Anything else, plain-text transports, and the placeholder values shipped in the
//! example `.env` are rejected before the server starts.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::error::ConfigError;

/// Placeholder URL from the example environment file.
pub const PLACEHOLDER_URL: &str = "your_supabase_project_url";

/// Placeholder key from the example environment file.
pub const PLACEHOLDER_KEY: &str = "your_supabase_anon_key";

/// Default per-request timeout for backend calls.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// `sslmode` values that guarantee an encrypted PostgreSQL connection.
const SECURE_SSL_MODES: &[&str] = &["require", "verify-ca", "verify-full"];

/// Backend selected by the database URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// Hosted REST gateway, addressed by the project base URL.
    Rest { base_url: Url },
    /// Direct PostgreSQL connection.
    Postgres { url: Url },
}

impl Backend {
    /// Short backend label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Backend::Rest { .. } => "rest",
            Backend::Postgres { .. } => "postgres",
        }
    }

    /// Host the backend connects to, for logs. Never includes credentials.
    pub fn host(&self) -> &str {
        match self {
            Backend::Rest { base_url } => base_url.host_str().unwrap_or_default(),
            Backend::Postgres { url } => url.host_str().unwrap_or_default(),
        }
    }
}

/// Raw connection settings, as read from the environment or CLI.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub database_url: Option<String>,
    pub api_key: Option<SecretString>,
    pub request_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            api_key: None,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

/// Settings that passed validation and can be handed to [`connect`](crate::connect).
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub backend: Backend,
    pub api_key: SecretString,
    pub request_timeout: Duration,
}

impl StoreConfig {
    pub fn new(database_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            database_url: Some(database_url.into()),
            api_key: Some(SecretString::from(api_key.into())),
            ..Self::default()
        }
    }

    pub fn with_request_timeout_ms(mut self, request_timeout_ms: u64) -> Self {
        self.request_timeout_ms = request_timeout_ms;
        self
    }

    /// Check presence, placeholders and transport security, and pick the backend.
    pub fn validate(&self) -> Result<ValidatedConfig, ConfigError> {
        let url = self
            .database_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty());
        let key = self
            .api_key
            .as_ref()
            .filter(|k| !k.expose_secret().trim().is_empty());

        let (Some(url), Some(key)) = (url, key) else {
            return Err(ConfigError::MissingCredentials);
        };

        if url == PLACEHOLDER_URL {
            return Err(ConfigError::PlaceholderUrl);
        }

        let backend = parse_backend(url)?;

        if key.expose_secret() == PLACEHOLDER_KEY {
            return Err(ConfigError::PlaceholderKey);
        }

        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout(
                "request timeout must be greater than zero".to_string(),
            ));
        }

        Ok(ValidatedConfig {
            backend,
            api_key: key.clone(),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
        })
    }
}

fn parse_backend(raw: &str) -> Result<Backend, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(e.to_string()))?;

    match url.scheme() {
        "https" => {
            if url.host_str().is_none() {
                return Err(ConfigError::InvalidUrl(format!("'{raw}' has no host")));
            }
            Ok(Backend::Rest { base_url: url })
        }
        "postgres" | "postgresql" => {
            let ssl_mode = url
                .query_pairs()
                .find(|(k, _)| k == "sslmode")
                .map(|(_, v)| v.into_owned());
            match ssl_mode {
                Some(mode) if SECURE_SSL_MODES.contains(&mode.as_str()) => {
                    Ok(Backend::Postgres { url })
                }
                _ => Err(ConfigError::InsecureUrl(redact(&url))),
            }
        }
        "http" => Err(ConfigError::InsecureUrl(redact(&url))),
        other => Err(ConfigError::UnsupportedScheme(other.to_string())),
    }
}

/// Render a URL without its password so it can be echoed in diagnostics.
fn redact(url: &Url) -> String {
    let mut shown = url.clone();
    if shown.password().is_some() {
        let _ = shown.set_password(Some("***"));
    }
    shown.to_string()
}
