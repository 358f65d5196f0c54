//! Row types for the `prompts` and `sessions` tables.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Table holding one row per saved prompt.
pub const PROMPTS_TABLE: &str = "prompts";

/// Table holding one row per chat session referenced by a prompt.
pub const SESSIONS_TABLE: &str = "sessions";

/// Insert payload for a prompt row.
///
/// `completed_at` is not part of the payload: every backend writes it as null on
/// insert and only [`PromptStore::complete_prompt`](crate::PromptStore::complete_prompt)
/// sets it afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewPrompt {
    pub text: String,
    pub metadata: Option<Map<String, Value>>,
    pub path: Option<String>,
    pub model: Option<String>,
    pub session_id: Option<String>,
}

impl NewPrompt {
    /// Start a payload with only the prompt text set.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: None,
            path: None,
            model: None,
            session_id: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Option<Map<String, Value>>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_path(mut self, path: Option<String>) -> Self {
        self.path = path;
        self
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    pub fn with_session_id(mut self, session_id: Option<String>) -> Self {
        self.session_id = session_id;
        self
    }
}

/// A stored prompt row as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PromptRecord {
    /// Database-assigned identifier, always carried as text.
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    #[sqlx(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A stored session row as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SessionRecord {
    pub session_id: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    #[sqlx(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Gateways may hand back integer or uuid primary keys; both are surfaced as text.
fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

/// Accepts RFC 3339 timestamps as well as the zone-less form a `timestamp`
/// (without time zone) column renders as; the latter is read as UTC.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(ts.with_timezone(&Utc)));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Some(naive.and_utc()))
        .map_err(|e| serde::de::Error::custom(format!("invalid timestamp '{raw}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_prompt_builder() {
        let prompt = NewPrompt::new("hello")
            .with_model(Some("gpt-4o".to_string()))
            .with_session_id(Some("s-1".to_string()));

        assert_eq!(prompt.text, "hello");
        assert_eq!(prompt.model.as_deref(), Some("gpt-4o"));
        assert_eq!(prompt.session_id.as_deref(), Some("s-1"));
        assert!(prompt.metadata.is_none());
        assert!(prompt.path.is_none());
    }

    #[test]
    fn test_prompt_record_from_gateway_row() {
        let row = json!({
            "id": "5f0c6f1e-8d3a-4b8e-9a43-2f9c0e6d1a27",
            "text": "hello",
            "metadata": {"source": "cli"},
            "path": "/work",
            "model": null,
            "session_id": null,
            "completed_at": null,
            "created_at": "2025-01-02T03:04:05.678+00:00"
        });

        let record: PromptRecord = serde_json::from_value(row).unwrap();
        assert_eq!(record.id, "5f0c6f1e-8d3a-4b8e-9a43-2f9c0e6d1a27");
        assert_eq!(record.metadata, Some(json!({"source": "cli"})));
        assert!(record.completed_at.is_none());
        assert!(record.created_at.is_some());
    }

    #[test]
    fn test_prompt_record_numeric_id() {
        let record: PromptRecord =
            serde_json::from_value(json!({"id": 42, "text": "t"})).unwrap();
        assert_eq!(record.id, "42");
        assert!(record.path.is_none());
    }

    #[test]
    fn test_prompt_record_rejects_object_id() {
        let result: Result<PromptRecord, _> =
            serde_json::from_value(json!({"id": {"nested": true}, "text": "t"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_zoneless_timestamp_read_as_utc() {
        let record: SessionRecord = serde_json::from_value(json!({
            "session_id": "abc",
            "updated_at": "2025-03-04T05:06:07.123456"
        }))
        .unwrap();
        let updated_at = record.updated_at.unwrap();
        assert_eq!(updated_at.to_rfc3339(), "2025-03-04T05:06:07.123456+00:00");
    }

    #[test]
    fn test_session_record_defaults() {
        let record: SessionRecord = serde_json::from_value(json!({"session_id": "abc"})).unwrap();
        assert_eq!(record.session_id, "abc");
        assert!(record.alias.is_none());
        assert!(record.updated_at.is_none());
    }
}
