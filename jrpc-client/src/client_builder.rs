//! Client builder for configuring transport and observability
//!
//! The `ClientBuilder` provides a fluent API for configuring a client
//! before use. It allows you to:
//! - Add request headers on top of the JSON defaults
//! - Disable TLS certificate verification (on by default)
//! - Bound each exchange with a timeout
//! - Replace the HTTP transport with any [`Transport`]
//! - Configure observability (OpenTelemetry) and the service name
//!
//! [`build`](ClientBuilder::build) returns a bare client offering `call`,
//! `notify` and `batch`. [`discover`](ClientBuilder::discover) additionally
//! fetches the server's method descriptors.
//!
//! # Examples
//!
//! ```rust,no_run
//! use jrpc_client::ClientBuilder;
//! use std::time::Duration;
//!
//! # async fn example() -> jrpc_core::Result<()> {
//! let client = ClientBuilder::new("https://localhost:8443/rpc")
//!     .header("Authorization", "Bearer token")
//!     .accept_invalid_certs(true)
//!     .timeout(Duration::from_secs(10))
//!     .discover()
//!     .await?;
//!
//! if let Some(sum) = client.method("sum") {
//!     println!("{:?}", sum.call((1, 2)).await?);
//! }
//!
//! // With observability
//! let traced = ClientBuilder::new("http://localhost:8080")
//!     .with_default_observability()
//!     .service_name("my-client")
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use crate::client::discover_methods;
use crate::transport::{HttpOptions, HttpTransport};
use crate::{ClientMetrics, JrpcClient, Transport};
use jrpc_core::{Error, Result};
use std::sync::Arc;
use std::time::Duration;

/// Builder for configuring and creating a [`JrpcClient`]
pub struct ClientBuilder {
    url: String,
    http: HttpOptions,
    transport: Option<Arc<dyn Transport>>,
    observability_config: Option<jrpc_core::ObservabilityConfig>,
    service_name: Option<String>,
}

impl ClientBuilder {
    /// Create a new client builder for an `http://` or `https://` endpoint
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http: HttpOptions::default(),
            transport: None,
            observability_config: None,
            service_name: None,
        }
    }

    /// Builder for a custom transport; the URL is unused
    pub fn with_transport(transport: impl Transport + 'static) -> Self {
        Self::new(String::new()).transport(transport)
    }

    /// Add a header sent with every request
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.http.headers.push((name.into(), value.into()));
        self
    }

    /// Accept invalid TLS certificates
    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.http.accept_invalid_certs = accept;
        self
    }

    /// Timeout of one exchange
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.http.timeout = Some(timeout);
        self
    }

    /// Use `transport` instead of HTTP; HTTP options are then ignored
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Enable OpenTelemetry observability with custom configuration
    pub fn with_observability(mut self, config: jrpc_core::ObservabilityConfig) -> Self {
        self.observability_config = Some(config);
        self
    }

    /// Enable OpenTelemetry observability with default configuration
    pub fn with_default_observability(mut self) -> Self {
        self.observability_config = Some(jrpc_core::ObservabilityConfig::default());
        self
    }

    /// Set service name for observability (used if observability is enabled)
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    /// Build a bare client
    pub fn build(self) -> Result<JrpcClient> {
        let (transport, metrics) = self.into_parts()?;
        Ok(JrpcClient::from_parts(transport, metrics, Vec::new()))
    }

    /// Build a client and discover the server's methods
    ///
    /// Discovery failures are not errors: the client is returned without
    /// discovered methods.
    pub async fn discover(self) -> Result<JrpcClient> {
        let (transport, metrics) = self.into_parts()?;
        let methods = discover_methods(transport.as_ref()).await;
        Ok(JrpcClient::from_parts(transport, metrics, methods))
    }

    fn into_parts(self) -> Result<(Arc<dyn Transport>, Option<Arc<ClientMetrics>>)> {
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::with_options(&self.url, self.http)?),
        };

        let metrics = if let Some(mut config) = self.observability_config {
            if let Some(name) = self.service_name {
                config.service_name = name;
            }

            jrpc_core::init_observability(config.clone()).map_err(|e| {
                Error::Internal(format!("Failed to initialize observability: {}", e))
            })?;

            Some(Arc::new(ClientMetrics::new(&config.service_name)))
        } else {
            None
        };

        tracing::debug!(url = %self.url, "Client configured");
        Ok((transport, metrics))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let builder = ClientBuilder::new("http://localhost:8080");

        assert_eq!(builder.url, "http://localhost:8080");
        assert!(builder.http.headers.is_empty());
        assert!(!builder.http.accept_invalid_certs);
        assert!(builder.http.timeout.is_none());
        assert!(builder.transport.is_none());
        assert!(builder.observability_config.is_none());
        assert!(builder.service_name.is_none());
    }

    #[test]
    fn test_builder_http_options() {
        let builder = ClientBuilder::new("https://localhost:8443")
            .header("X-Trace", "1")
            .accept_invalid_certs(true)
            .timeout(Duration::from_millis(250));

        assert_eq!(builder.http.headers, vec![("X-Trace".to_string(), "1".to_string())]);
        assert!(builder.http.accept_invalid_certs);
        assert_eq!(builder.http.timeout, Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_builder_observability_config() {
        let config = jrpc_core::ObservabilityConfig::new("test-client")
            .with_endpoint("http://localhost:4317")
            .with_log_level("debug");

        let builder = ClientBuilder::new("http://localhost:8080")
            .with_observability(config)
            .service_name("renamed");

        let obs_config = builder.observability_config.as_ref().unwrap();
        assert_eq!(obs_config.service_name, "test-client");
        assert_eq!(obs_config.log_level, "debug");
        assert_eq!(builder.service_name.as_deref(), Some("renamed"));
    }

    #[test]
    fn test_builder_default_observability() {
        let builder = ClientBuilder::new("http://localhost:8080").with_default_observability();
        assert_eq!(builder.observability_config.unwrap().service_name, "jrpc");
    }

    #[test]
    fn test_build_rejects_bad_url() {
        let result = ClientBuilder::new("ws://localhost:8080").build();
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_build_http_client() {
        let client = ClientBuilder::new("http://localhost:8080/rpc").build().unwrap();
        assert!(client.methods().is_empty());
        assert!(client.method("anything").is_none());
    }

    #[tokio::test]
    async fn test_discover_swallows_failures() {
        // Nothing listens on port 1
        let client = ClientBuilder::new("http://127.0.0.1:1/")
            .timeout(Duration::from_secs(2))
            .discover()
            .await
            .unwrap();
        assert!(client.methods().is_empty());
    }
}
