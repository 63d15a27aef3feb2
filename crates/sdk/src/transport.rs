//! Transport abstraction under the gateway.
//!
//! The gateway speaks to the backend through this trait so the rest of the
//! SDK is independent of the concrete HTTP stack: production uses
//! [`HttpTransport`](crate::http::HttpTransport), tests use
//! [`MockBackend`](crate::mock::MockBackend).

use std::fmt;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Result;

/// HTTP method subset used by the console backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Collection and record reads.
    Get,
    /// Login and record creation.
    Post,
    /// Status mutations and read marks.
    Put,
    /// Record and collection deletion.
    Delete,
}

impl Method {
    /// Wire name of the method.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One outbound request, fully resolved (absolute URL, canonical
/// authorization header value when authenticated).
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute request URL.
    pub url: String,
    /// Canonical `Authorization` header value, when the session holds a
    /// credential.
    pub bearer: Option<String>,
    /// JSON request body, when the endpoint takes one.
    pub body: Option<Value>,
}

/// One resolved response. Transport-level failures (connect, timeout) are
/// errors from [`Transport::execute`], not responses.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// Whether the status is in the 2xx range.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parses the body as JSON; an empty body parses as `null`.
    ///
    /// # Errors
    ///
    /// Returns a decode error when the body is non-empty and not valid JSON
    /// for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        if self.body.is_empty() {
            return Ok(serde_json::from_value(Value::Null)?);
        }
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Best-effort human-readable failure message for a non-2xx response:
    /// the backend's `message` field when present, else the raw body, else
    /// the status code.
    #[must_use]
    pub fn error_message(&self) -> String {
        if let Ok(value) = serde_json::from_slice::<Value>(&self.body)
            && let Some(message) = value.get("message").and_then(Value::as_str)
        {
            return message.to_owned();
        }
        let raw = String::from_utf8_lossy(&self.body);
        let raw = raw.trim();
        if raw.is_empty() { format!("HTTP {}", self.status) } else { raw.to_owned() }
    }
}

/// Executes resolved requests against the backend.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Executes one request.
    ///
    /// # Errors
    ///
    /// Returns a transport error for connect/IO-level failures. HTTP error
    /// statuses are returned as responses, not errors; classification is
    /// the gateway's job.
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse>;
}
