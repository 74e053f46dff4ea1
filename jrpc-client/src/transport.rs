//! Transports carrying JSON-RPC payloads
//!
//! The client engine only needs two exchanges from the wire:
//!
//! - **send**: deliver an encoded payload and hand back the raw response
//!   body (empty when the server answered with no content)
//! - **describe**: fetch the raw descriptor list used for discovery
//!
//! [`HttpTransport`] implements both over HTTP with `reqwest`: `POST` for
//! payloads, `GET` for descriptors. Any other carrier (an in-process
//! dispatcher, a test double, a message queue) can implement [`Transport`]
//! and be handed to [`ClientBuilder::transport`](crate::ClientBuilder::transport).
//!
//! Transport failures are returned as [`Error::Transport`] with the original
//! error kept as the source; the engine never rewrites them.

use async_trait::async_trait;
use jrpc_core::{Error, Result, TransportError};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use std::time::Duration;

const JSON_MIME: &str = "application/json";

/// Carrier of encoded JSON-RPC payloads
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver `body` and return the raw response body
    async fn send(&self, body: Vec<u8>) -> Result<Vec<u8>>;

    /// Fetch the raw method descriptor list
    async fn describe(&self) -> Result<Vec<u8>> {
        Err(Error::Transport(TransportError::message(
            "transport does not support method discovery",
        )))
    }
}

/// Options for [`HttpTransport`]
#[derive(Debug, Clone, Default)]
pub struct HttpOptions {
    /// Extra headers, applied over the JSON defaults
    pub headers: Vec<(String, String)>,
    /// Skip TLS certificate verification
    pub accept_invalid_certs: bool,
    /// Overall timeout of one exchange
    pub timeout: Option<Duration>,
}

/// HTTP transport: `POST` for payloads, `GET` for descriptors
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: reqwest::Url,
}

impl HttpTransport {
    /// Transport for `url` with default options
    pub fn new(url: &str) -> Result<Self> {
        Self::with_options(url, HttpOptions::default())
    }

    /// Transport for `url`
    ///
    /// Only `http` and `https` URLs are accepted.
    pub fn with_options(url: &str, options: HttpOptions) -> Result<Self> {
        let url = reqwest::Url::parse(url)
            .map_err(|e| Error::InvalidArgument(format!("Invalid URL '{}': {}", url, e)))?;

        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(Error::InvalidArgument(format!(
                    "Protocol \"{}:\" not supported. Expected \"http:\" or \"https:\"",
                    other
                )))
            }
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(JSON_MIME));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_MIME));
        for (name, value) in &options.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::InvalidArgument(format!("Invalid header name '{}': {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::InvalidArgument(format!("Invalid header value: {}", e)))?;
            headers.insert(name, value);
        }

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .danger_accept_invalid_certs(options.accept_invalid_certs);
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(Error::transport)?;

        Ok(Self { client, url })
    }

    /// Endpoint URL
    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn read(response: reqwest::Response) -> Result<Vec<u8>> {
        // 4xx and 5xx are transport failures, whatever the body says
        let response = response.error_for_status().map_err(Error::transport)?;
        let body = response.bytes().await.map_err(Error::transport)?;
        Ok(body.to_vec())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[tracing::instrument(skip(self, body), fields(url = %self.url, bytes = body.len()))]
    async fn send(&self, body: Vec<u8>) -> Result<Vec<u8>> {
        let response = self
            .client
            .post(self.url.clone())
            .body(body)
            .send()
            .await
            .map_err(Error::transport)?;
        tracing::debug!(status = %response.status(), "POST completed");
        Self::read(response).await
    }

    #[tracing::instrument(skip(self), fields(url = %self.url))]
    async fn describe(&self) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(Error::transport)?;
        Self::read(response).await
    }
}
