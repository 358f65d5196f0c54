//! # Store Error Types
//!
//! Errors raised while talking to a prompt store backend, and while validating
//! the startup configuration that selects one.

use thiserror::Error;

/// Store operation result type
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors returned by [`PromptStore`](crate::PromptStore) backends
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("{0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("JSON serialization/deserialization failed: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Non-success response from the REST gateway. `message` is the gateway's
    /// own error text when the body carried one.
    #[error("{message}")]
    ApiError {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// A database call did not finish within the configured timeout.
    #[error("{operation} timed out after {timeout_ms} ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u64,
    },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl StoreError {
    /// Create an API error from a gateway response
    pub fn api_error(status: u16, code: Option<String>, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            code,
            message: message.into(),
        }
    }

    /// Create an unexpected response error for payloads the backend should not return
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::UnexpectedResponse(message.into())
    }

    /// Check if the failure happened before the backend accepted the request
    #[must_use]
    pub fn is_connection_failure(&self) -> bool {
        match self {
            StoreError::HttpError(e) => e.is_timeout() || e.is_connect(),
            StoreError::DatabaseError(e) => matches!(
                e,
                sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::Tls(_)
            ),
            _ => false,
        }
    }
}

/// Startup configuration errors. Any of these aborts the process before the
/// transport is opened.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variables: SUPABASE_URL and SUPABASE_ANON_KEY")]
    MissingCredentials,

    #[error("Invalid SUPABASE_URL: Please provide a valid Supabase project URL")]
    PlaceholderUrl,

    #[error("Invalid SUPABASE_URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid SUPABASE_URL: scheme '{0}' is not supported (expected https, postgres or postgresql)")]
    UnsupportedScheme(String),

    #[error("Invalid SUPABASE_URL: '{0}' does not use a secure transport")]
    InsecureUrl(String),

    #[error("Invalid SUPABASE_ANON_KEY: Please provide a valid Supabase anon key")]
    PlaceholderKey,

    #[error("Invalid request timeout: {0}")]
    InvalidTimeout(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_displays_gateway_message() {
        let err = StoreError::api_error(
            409,
            Some("23505".to_string()),
            "duplicate key value violates unique constraint",
        );
        assert_eq!(
            err.to_string(),
            "duplicate key value violates unique constraint"
        );
        assert!(matches!(
            err,
            StoreError::ApiError { status: 409, ref code, .. } if code.as_deref() == Some("23505")
        ));
    }

    #[test]
    fn test_unexpected_constructor() {
        let err = StoreError::unexpected("insert returned no rows");
        assert_eq!(err.to_string(), "Unexpected response: insert returned no rows");
        assert!(!err.is_connection_failure());
    }

    #[test]
    fn test_timeout_message() {
        let err = StoreError::Timeout {
            operation: "prompt insert",
            timeout_ms: 250,
        };
        assert_eq!(err.to_string(), "prompt insert timed out after 250 ms");
    }

    #[test]
    fn test_pool_timeout_is_connection_failure() {
        let err = StoreError::from(sqlx::Error::PoolTimedOut);
        assert!(err.is_connection_failure());
    }

    #[test]
    fn test_config_error_messages() {
        assert!(ConfigError::MissingCredentials
            .to_string()
            .contains("SUPABASE_URL and SUPABASE_ANON_KEY"));
        assert!(ConfigError::InsecureUrl("http://example.com".into())
            .to_string()
            .contains("secure transport"));
        assert!(ConfigError::PlaceholderKey
            .to_string()
            .starts_with("Invalid SUPABASE_ANON_KEY"));
    }
}
