//! Authenticated request gateway.
//!
//! Every outbound call crosses this type. It attaches the session credential
//! in canonical form, applies the bounded request timeout, and classifies
//! failures:
//!
//! - authorization failure (401/403) → [`SessionStore::clear`] runs before
//!   the caller sees anything, then a distinguished `Unauthorized` condition
//!   is raised
//! - every other non-2xx status, connect failure, or timeout →
//!   `Transport` with the status and message retained
//!
//! A response that resolves after the session epoch has advanced is
//! discarded as `Unauthorized`; a torn-down session never receives late
//! state writes. The gateway never navigates or mutates UI.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use url::Url;

use crate::error::{Result, SdkError};
use crate::session::SessionStore;
use crate::transport::{Method, Transport, TransportRequest};

/// The single choke point between the console and the backend.
#[derive(Debug, Clone)]
pub struct Gateway {
    transport: Arc<dyn Transport>,
    session: Arc<SessionStore>,
    base_url: Url,
    timeout: Duration,
}

impl Gateway {
    /// Creates a gateway over the given transport and session store.
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        session: Arc<SessionStore>,
        base_url: Url,
        timeout: Duration,
    ) -> Self {
        Self { transport, session, base_url, timeout }
    }

    /// The session store this gateway reports into.
    #[must_use]
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Issues one request. `path` is relative to the configured base URL and
    /// may carry a query string.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` on 401/403 (the session is cleared first) or when
    ///   the session was torn down while the request was in flight
    /// - `Transport` on any other failure, including timeout
    pub async fn request(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let epoch = self.session.epoch();
        let url = self.resolve(path)?;
        let bearer = self.session.credential().map(|c| c.authorization_value());

        tracing::debug!(%method, path, authenticated = bearer.is_some(), "dispatching request");
        let request = TransportRequest { method, url, bearer, body };
        let response = match tokio::time::timeout(self.timeout, self.transport.execute(request))
            .await
        {
            Ok(outcome) => outcome?,
            Err(_) => {
                return Err(SdkError::Transport {
                    status: None,
                    message: format!("request timed out after {}ms", self.timeout.as_millis()),
                });
            }
        };

        if self.session.epoch() != epoch {
            tracing::debug!(path, "discarding response from a torn-down session");
            return Err(SdkError::Unauthorized);
        }

        match response.status {
            401 | 403 => {
                tracing::debug!(path, status = response.status, "authorization failure");
                self.session.clear();
                Err(SdkError::Unauthorized)
            }
            _ if response.is_success() => response.json(),
            status => Err(SdkError::Transport {
                status: Some(status),
                message: response.error_message(),
            }),
        }
    }

    fn resolve(&self, path: &str) -> Result<String> {
        let relative = path.trim_start_matches('/');
        let url = self.base_url.join(relative).map_err(|err| SdkError::Config {
            message: format!("invalid request path {path:?}: {err}"),
        })?;
        Ok(url.into())
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use masthead_types::AdminIdentity;
    use parking_lot::Mutex;

    use super::*;
    use crate::session::MemorySessionStorage;
    use crate::transport::TransportResponse;

    /// Canned transport recording the requests it saw.
    #[derive(Debug, Default)]
    struct CannedTransport {
        responses: Mutex<Vec<TransportResponse>>,
        seen: Mutex<Vec<TransportRequest>>,
    }

    impl CannedTransport {
        fn push(&self, status: u16, body: &str) {
            self.responses
                .lock()
                .push(TransportResponse { status, body: body.as_bytes().to_vec() });
        }
    }

    #[async_trait]
    impl Transport for CannedTransport {
        async fn execute(&self, request: TransportRequest) -> Result<TransportResponse> {
            self.seen.lock().push(request);
            let mut responses = self.responses.lock();
            if responses.is_empty() {
                return Ok(TransportResponse { status: 200, body: b"{}".to_vec() });
            }
            Ok(responses.remove(0))
        }
    }

    fn authenticated_gateway(transport: Arc<CannedTransport>) -> Gateway {
        let session = Arc::new(SessionStore::new(Box::new(MemorySessionStorage::default())));
        session
            .acquire(
                AdminIdentity {
                    id: "adm-1".to_owned(),
                    email: "staff@masthead.io".to_owned(),
                    role: "editor".to_owned(),
                },
                "tok-1",
            )
            .unwrap();
        Gateway::new(
            transport,
            session,
            Url::parse("https://console.test/api/").unwrap(),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_attaches_canonical_bearer() {
        let transport = Arc::new(CannedTransport::default());
        let gateway = authenticated_gateway(transport.clone());
        gateway.request(Method::Get, "articles", None).await.unwrap();
        let seen = transport.seen.lock();
        assert_eq!(seen[0].bearer.as_deref(), Some("Bearer tok-1"));
        assert_eq!(seen[0].url, "https://console.test/api/articles");
    }

    #[tokio::test]
    async fn test_unauthenticated_when_no_session() {
        let transport = Arc::new(CannedTransport::default());
        let session = Arc::new(SessionStore::new(Box::new(MemorySessionStorage::default())));
        let gateway = Gateway::new(
            transport.clone(),
            session,
            Url::parse("https://console.test/api/").unwrap(),
            Duration::from_secs(5),
        );
        gateway.request(Method::Get, "articles", None).await.unwrap();
        assert!(transport.seen.lock()[0].bearer.is_none());
    }

    #[tokio::test]
    async fn test_authorization_failure_tears_down_session() {
        let transport = Arc::new(CannedTransport::default());
        transport.push(401, r#"{"message":"expired"}"#);
        let gateway = authenticated_gateway(transport);
        let err = gateway.request(Method::Get, "articles", None).await.unwrap_err();
        assert!(err.is_unauthorized());
        assert!(!gateway.session().is_authenticated());
    }

    #[tokio::test]
    async fn test_server_error_becomes_transport() {
        let transport = Arc::new(CannedTransport::default());
        transport.push(503, r#"{"message":"maintenance"}"#);
        let gateway = authenticated_gateway(transport);
        let err = gateway.request(Method::Get, "articles", None).await.unwrap_err();
        assert_eq!(err.status(), Some(503));
        assert!(err.to_string().contains("maintenance"));
        // Non-auth failures leave the session alone.
        assert!(gateway.session().is_authenticated());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_surfaces_as_transport() {
        #[derive(Debug)]
        struct StalledTransport;

        #[async_trait]
        impl Transport for StalledTransport {
            async fn execute(&self, _request: TransportRequest) -> Result<TransportResponse> {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(TransportResponse { status: 200, body: Vec::new() })
            }
        }

        let session = Arc::new(SessionStore::new(Box::new(MemorySessionStorage::default())));
        let gateway = Gateway::new(
            Arc::new(StalledTransport),
            session,
            Url::parse("https://console.test/api/").unwrap(),
            Duration::from_millis(50),
        );
        let err = gateway.request(Method::Get, "articles", None).await.unwrap_err();
        assert_eq!(err.status(), None);
        assert!(err.to_string().contains("timed out"));
    }
}
