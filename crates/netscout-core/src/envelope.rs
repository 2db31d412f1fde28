//! JSON response envelopes returned by every tool.
//!
//! A success envelope is `{"status": "success", ...fields}`. A failure
//! envelope echoes the input that identifies the request, then carries a
//! human-readable `message`, the error category and a retry hint:
//!
//! ```json
//! {
//!   "status": "error",
//!   "url": "https://example.com",
//!   "message": "Failed to fetch webpage: Network error: ...",
//!   "error_kind": "transport",
//!   "retryable": true
//! }
//! ```
//!
//! Missing resources use `"status": "not_found"` instead of `"error"`.

use crate::Error;
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::warn;

/// Outcome tag of an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// The operation produced a result.
    Success,
    /// The operation failed.
    Error,
    /// The requested resource does not exist.
    NotFound,
}

/// A `status` tag followed by the fields of `body`.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T> {
    status: Status,
    #[serde(flatten)]
    body: T,
}

impl<T: Serialize> Envelope<T> {
    /// Wrap `body` in a success envelope.
    pub const fn success(body: T) -> Self {
        Self {
            status: Status::Success,
            body,
        }
    }

    /// Wrap `body` in a not-found envelope.
    pub const fn not_found(body: T) -> Self {
        Self {
            status: Status::NotFound,
            body,
        }
    }

    /// Serialize with 2-space indentation.
    pub fn render(&self) -> String {
        render_pretty(self)
    }
}

/// Builder for failure envelopes.
///
/// ```rust
/// use netscout_core::envelope::Failure;
/// use netscout_core::Error;
///
/// let err = Error::Parse("unexpected token".into());
/// let json = Failure::new("Search failed", &err).subject("query", "rust").render();
/// let value: serde_json::Value = serde_json::from_str(&json).unwrap();
///
/// assert_eq!(value["status"], "error");
/// assert_eq!(value["query"], "rust");
/// assert_eq!(value["message"], "Search failed: Parse error: unexpected token");
/// assert_eq!(value["error_kind"], "parse");
/// assert_eq!(value["retryable"], false);
/// ```
#[derive(Debug, Clone)]
pub struct Failure {
    status: Status,
    subject: Option<(&'static str, Value)>,
    message: String,
    error_kind: &'static str,
    retryable: bool,
}

impl Failure {
    /// Describe `err`, prefixing the message with what was being attempted.
    ///
    /// HTTP status errors already read as a complete sentence
    /// (`HTTP error 404: Not Found`) and are reported without the prefix.
    pub fn new(prefix: &str, err: &Error) -> Self {
        let message = match err {
            Error::HttpStatus { .. } => err.to_string(),
            _ => format!("{prefix}: {err}"),
        };
        let status = if err.is_not_found() {
            Status::NotFound
        } else {
            Status::Error
        };
        warn!(category = err.category(), "{message}");
        Self {
            status,
            subject: None,
            message,
            error_kind: err.category(),
            retryable: err.is_recoverable(),
        }
    }

    /// Echo the request identifier under `key`.
    #[must_use]
    pub fn subject(mut self, key: &'static str, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.subject = Some((key, value));
        self
    }

    /// The failure description.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Serialize with 2-space indentation.
    pub fn render(&self) -> String {
        let mut map = Map::new();
        map.insert("status".into(), json!(self.status));
        if let Some((key, value)) = &self.subject {
            map.insert((*key).into(), value.clone());
        }
        map.insert("message".into(), Value::String(self.message.clone()));
        map.insert("error_kind".into(), Value::String(self.error_kind.into()));
        map.insert("retryable".into(), Value::Bool(self.retryable));
        render_pretty(&Value::Object(map))
    }
}

fn render_pretty<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| {
        json!({
            "status": Status::Error,
            "message": format!("Failed to serialize response: {e}"),
            "error_kind": "serialization",
            "retryable": false,
        })
        .to_string()
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Body {
        url: &'static str,
        title: &'static str,
    }

    #[test]
    fn test_success_places_status_first() {
        let json = Envelope::success(Body {
            url: "https://a.example",
            title: "A",
        })
        .render();

        assert!(json.starts_with("{\n  \"status\": \"success\",\n  \"url\""));
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["title"], "A");
    }

    #[test]
    fn test_not_found_status_tag() {
        let json = Envelope::not_found(json!({"query": "q"})).render();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["status"], "not_found");
    }

    #[test]
    fn test_failure_field_order() {
        let err = Error::Backend("quota exceeded".into());
        let json = Failure::new("Translation failed", &err)
            .subject("text", "hola")
            .render();
        let value: Value = serde_json::from_str(&json).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();

        assert_eq!(keys, ["status", "text", "message", "error_kind", "retryable"]);
        assert_eq!(value["message"], "Translation failed: quota exceeded");
    }

    #[test]
    fn test_http_404_maps_to_not_found_without_prefix() {
        let err = Error::from_status(reqwest::StatusCode::NOT_FOUND);
        let json = Failure::new("Failed to fetch webpage", &err)
            .subject("url", "https://a.example/missing")
            .render();
        let value: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["status"], "not_found");
        assert_eq!(value["message"], "HTTP error 404: Not Found");
        assert_eq!(value["error_kind"], "not_found");
    }

    #[test]
    fn test_server_error_is_retryable() {
        let err = Error::from_status(reqwest::StatusCode::SERVICE_UNAVAILABLE);
        let json = Failure::new("Search failed", &err).render();
        let value: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["status"], "error");
        assert_eq!(value["retryable"], true);
        assert!(value.get("query").is_none());
    }
}
