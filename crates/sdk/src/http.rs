//! HTTP transport backed by reqwest.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;

use crate::config::ClientConfig;
use crate::error::{Result, SdkError};
use crate::transport::{Method, Transport, TransportRequest, TransportResponse};

/// Production transport over a shared [`reqwest::Client`].
///
/// The underlying client pools connections and is cheap to clone; one
/// instance serves the whole console.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Builds the transport from client configuration.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the underlying client cannot be
    /// constructed (TLS backend initialization).
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|err| SdkError::Transport { status: None, message: err.to_string() })?;
        Ok(Self { client })
    }

    fn method_of(method: Method) -> reqwest::Method {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse> {
        let mut builder = self.client.request(Self::method_of(request.method), &request.url);
        if let Some(bearer) = &request.bearer {
            builder = builder.header(AUTHORIZATION, bearer);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| SdkError::Transport { status: None, message: err.to_string() })?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|err| SdkError::Transport { status: Some(status), message: err.to_string() })?
            .to_vec();

        Ok(TransportResponse { status, body })
    }
}
