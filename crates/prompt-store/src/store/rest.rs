//! REST gateway backend.
//!
//! Speaks the PostgREST dialect the hosted database exposes under
//! `{base_url}/rest/v1/{table}`: equality filters as `column=eq.value`, row
//! payloads as JSON arrays, and `Prefer` headers for returning rows and for
//! conflict resolution.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Method, Request, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use super::PromptStore;
use crate::error::{StoreError, StoreResult};
use crate::models::{NewPrompt, PromptRecord, SessionRecord, PROMPTS_TABLE, SESSIONS_TABLE};

const REST_PATH: &str = "rest/v1/";
const APIKEY_HEADER: &str = "apikey";
const PREFER_HEADER: &str = "prefer";
const RETURN_ROWS: &str = "return=representation";
const UPSERT_RETURN_ROWS: &str = "resolution=merge-duplicates,return=representation";

/// Error body returned by the gateway on non-2xx responses.
#[derive(Debug, Deserialize)]
struct GatewayError {
    #[serde(default)]
    code: Option<Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

/// [`PromptStore`] backed by the hosted REST gateway.
pub struct RestStore {
    client: Client,
    rest_url: Url,
    api_key: SecretString,
}

impl std::fmt::Debug for RestStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestStore")
            .field("rest_url", &self.rest_url.as_str())
            .finish_non_exhaustive()
    }
}

impl RestStore {
    /// Create a client for the project at `base_url`.
    ///
    /// `timeout` bounds every request end to end.
    pub fn new(base_url: &Url, api_key: &SecretString, timeout: Duration) -> StoreResult<Self> {
        let mut base = base_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let rest_url = base
            .join(REST_PATH)
            .map_err(|e| StoreError::InvalidInput(format!("invalid REST base URL: {e}")))?;

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            rest_url,
            api_key: api_key.clone(),
        })
    }

    fn table_url(&self, table: &str) -> StoreResult<Url> {
        self.rest_url
            .join(table)
            .map_err(|e| StoreError::InvalidInput(format!("invalid table name '{table}': {e}")))
    }

    /// Authentication and content headers shared by every call.
    fn auth_headers(&self, prefer: &'static str) -> StoreResult<HeaderMap> {
        let key = self.api_key.expose_secret();
        let mut apikey = HeaderValue::from_str(key)
            .map_err(|_| StoreError::InvalidInput("API key is not a valid header value".into()))?;
        apikey.set_sensitive(true);
        let mut bearer = HeaderValue::from_str(&format!("Bearer {key}"))
            .map_err(|_| StoreError::InvalidInput("API key is not a valid header value".into()))?;
        bearer.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static(APIKEY_HEADER), apikey);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(
            HeaderName::from_static(PREFER_HEADER),
            HeaderValue::from_static(prefer),
        );
        Ok(headers)
    }

    fn upsert_session_request(
        &self,
        session_id: &str,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<Request> {
        let body = json!([{
            "session_id": session_id,
            "updated_at": timestamp(updated_at),
        }]);
        let request = self
            .client
            .request(Method::POST, self.table_url(SESSIONS_TABLE)?)
            .headers(self.auth_headers(UPSERT_RETURN_ROWS)?)
            .query(&[("on_conflict", "session_id")])
            .json(&body)
            .build()?;
        Ok(request)
    }

    fn insert_prompt_request(&self, prompt: &NewPrompt) -> StoreResult<Request> {
        let body = json!([{
            "text": prompt.text,
            "metadata": prompt.metadata,
            "path": prompt.path,
            "model": prompt.model,
            "session_id": prompt.session_id,
            "completed_at": Value::Null,
        }]);
        let request = self
            .client
            .request(Method::POST, self.table_url(PROMPTS_TABLE)?)
            .headers(self.auth_headers(RETURN_ROWS)?)
            .json(&body)
            .build()?;
        Ok(request)
    }

    fn complete_prompt_request(&self, id: &str, completed_at: DateTime<Utc>) -> StoreResult<Request> {
        let body = json!({ "completed_at": timestamp(completed_at) });
        let request = self
            .client
            .request(Method::PATCH, self.table_url(PROMPTS_TABLE)?)
            .headers(self.auth_headers(RETURN_ROWS)?)
            .query(&[("id", format!("eq.{id}"))])
            .json(&body)
            .build()?;
        Ok(request)
    }

    async fn execute<T: DeserializeOwned>(&self, request: Request) -> StoreResult<Vec<T>> {
        debug!(method = %request.method(), path = request.url().path(), "REST gateway request");
        let response = self.client.execute(request).await?;
        read_rows(response).await
    }
}

#[async_trait]
impl PromptStore for RestStore {
    async fn upsert_session(
        &self,
        session_id: &str,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<SessionRecord> {
        let request = self.upsert_session_request(session_id, updated_at)?;
        let rows: Vec<SessionRecord> = self.execute(request).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::unexpected("session upsert returned no rows"))
    }

    async fn insert_prompt(&self, prompt: &NewPrompt) -> StoreResult<PromptRecord> {
        let request = self.insert_prompt_request(prompt)?;
        let rows: Vec<PromptRecord> = self.execute(request).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::unexpected("prompt insert returned no rows"))
    }

    async fn complete_prompt(&self, id: &str, completed_at: DateTime<Utc>) -> StoreResult<u64> {
        let request = self.complete_prompt_request(id, completed_at)?;
        let rows: Vec<Value> = self.execute(request).await?;
        Ok(rows.len() as u64)
    }
}

/// Timestamps go over the wire as millisecond RFC 3339 in UTC (`…Z`).
fn timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

async fn read_rows<T: DeserializeOwned>(response: Response) -> StoreResult<Vec<T>> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(gateway_error(status.as_u16(), &body));
    }
    parse_rows(&body)
}

fn parse_rows<T: DeserializeOwned>(body: &str) -> StoreResult<Vec<T>> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(body)?)
}

fn gateway_error(status: u16, body: &str) -> StoreError {
    match serde_json::from_str::<GatewayError>(body) {
        Ok(GatewayError {
            code,
            message: Some(message),
            details,
        }) => {
            let code = code.map(|c| match c {
                Value::String(s) => s,
                other => other.to_string(),
            });
            let message = match details {
                Some(details) if !details.is_empty() => format!("{message} ({details})"),
                _ => message,
            };
            StoreError::api_error(status, code, message)
        }
        _ if body.trim().is_empty() => {
            StoreError::api_error(status, None, format!("HTTP {status} with empty body"))
        }
        _ => StoreError::api_error(status, None, format!("HTTP {status}: {}", body.trim())),
    }
}
