//! Direct PostgreSQL backend.
//!
//! Uses the same `prompts` / `sessions` tables the REST gateway fronts. The tables
//! are expected to exist: `sessions.session_id` must carry a unique constraint
//! for the upsert, and `prompts.session_id` is written as text. `created_at` is
//! left to column defaults and not read back.

use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{debug, warn};
use url::Url;

use super::PromptStore;
use crate::config::DEFAULT_REQUEST_TIMEOUT_MS;
use crate::error::{StoreError, StoreResult};
use crate::models::{NewPrompt, PromptRecord, SessionRecord};

/// A single connection serves the one stdio client; the pool only exists to
/// reconnect after the server side drops it.
const MAX_CONNECTIONS: u32 = 1;

const UPSERT_SESSION_SQL: &str = r#"
INSERT INTO sessions (session_id, alias, updated_at)
VALUES ($1, NULL, $2)
ON CONFLICT (session_id) DO UPDATE SET updated_at = EXCLUDED.updated_at
RETURNING session_id::text AS session_id,
          alias,
          updated_at::timestamptz AS updated_at
"#;

const INSERT_PROMPT_SQL: &str = r#"
INSERT INTO prompts (text, metadata, path, model, session_id, completed_at)
VALUES ($1, $2, $3, $4, $5, NULL)
RETURNING id::text AS id,
          text,
          metadata::jsonb AS metadata,
          path,
          model,
          session_id::text AS session_id,
          completed_at::timestamptz AS completed_at
"#;

const COMPLETE_PROMPT_SQL: &str = r#"
UPDATE prompts SET completed_at = $1 WHERE id::text = $2
"#;

/// [`PromptStore`] backed by a PostgreSQL connection pool.
///
/// Every statement is bounded by `query_timeout`; a call that does not finish in
/// time is abandoned and reported as [`StoreError::Timeout`].
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
    query_timeout: Duration,
}

impl PgStore {
    /// Connect using `url`. When the URL carries no password, `api_key` is used
    /// as the database password. `timeout` bounds both waiting for the
    /// connection and each statement run on it.
    pub async fn connect(url: &Url, api_key: &SecretString, timeout: Duration) -> StoreResult<Self> {
        let mut options = PgConnectOptions::from_str(url.as_str())?;
        if url.password().is_none() {
            options = options.password(api_key.expose_secret());
        }

        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(timeout)
            .connect_with(options)
            .await?;

        debug!(host = url.host_str().unwrap_or_default(), "PostgreSQL pool ready");
        Ok(Self {
            pool,
            query_timeout: timeout,
        })
    }

    /// Wrap an existing pool with the default statement timeout.
    pub fn with_pool(pool: PgPool) -> Self {
        Self {
            pool,
            query_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
        }
    }

    pub fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn bounded<T, F>(&self, operation: &'static str, query: F) -> StoreResult<T>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        with_timeout(self.query_timeout, operation, query).await
    }
}

async fn with_timeout<T, F>(timeout: Duration, operation: &'static str, query: F) -> StoreResult<T>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(timeout, query).await {
        Ok(result) => Ok(result?),
        Err(_) => {
            warn!(operation, timeout_ms = timeout.as_millis() as u64, "PostgreSQL statement timed out");
            Err(StoreError::Timeout {
                operation,
                timeout_ms: timeout.as_millis() as u64,
            })
        }
    }
}

#[async_trait]
impl PromptStore for PgStore {
    async fn upsert_session(
        &self,
        session_id: &str,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<SessionRecord> {
        let query = sqlx::query_as::<_, SessionRecord>(UPSERT_SESSION_SQL)
            .bind(session_id)
            .bind(updated_at)
            .fetch_one(&self.pool);
        self.bounded("session upsert", query).await
    }

    async fn insert_prompt(&self, prompt: &NewPrompt) -> StoreResult<PromptRecord> {
        let metadata = prompt.metadata.clone().map(Json);
        let query = sqlx::query_as::<_, PromptRecord>(INSERT_PROMPT_SQL)
            .bind(&prompt.text)
            .bind(metadata)
            .bind(&prompt.path)
            .bind(&prompt.model)
            .bind(&prompt.session_id)
            .fetch_optional(&self.pool);
        let record = self.bounded("prompt insert", query).await?;
        record.ok_or_else(|| StoreError::unexpected("prompt insert returned no rows"))
    }

    async fn complete_prompt(&self, id: &str, completed_at: DateTime<Utc>) -> StoreResult<u64> {
        let query = sqlx::query(COMPLETE_PROMPT_SQL)
            .bind(completed_at)
            .bind(id)
            .execute(&self.pool);
        let result = self.bounded("prompt completion", query).await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stalled_statement_times_out() {
        let stalled = std::future::pending::<Result<u64, sqlx::Error>>();
        let err = with_timeout(Duration::from_millis(20), "prompt completion", stalled)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Timeout {
                operation: "prompt completion",
                timeout_ms: 20
            }
        ));
    }

    #[tokio::test]
    async fn test_finished_statement_passes_through() {
        let done = async { Ok::<_, sqlx::Error>(3_u64) };
        assert_eq!(
            with_timeout(Duration::from_secs(1), "prompt completion", done)
                .await
                .unwrap(),
            3
        );

        let failed = async { Err::<u64, _>(sqlx::Error::RowNotFound) };
        let err = with_timeout(Duration::from_secs(1), "prompt completion", failed)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DatabaseError(sqlx::Error::RowNotFound)));
    }
}
