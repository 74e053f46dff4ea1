//! Server builder
//!
//! Fluent configuration of a [`JrpcServer`]: bind address, endpoint path,
//! registered methods, batch execution and observability.
//!
//! Registration errors (a definition without a name, for example) do not
//! break the chain; the first one is reported by [`ServerBuilder::build`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use jrpc_server::{from_fn, BatchMode, JrpcServer};
//!
//! # async fn example() -> jrpc_core::Result<()> {
//! let server = JrpcServer::builder()
//!     .bind_str("127.0.0.1:8080")?
//!     .endpoint("/rpc")
//!     .handler("ping", from_fn(|_| async { Ok(serde_json::json!("pong")) }))
//!     .batch_mode(BatchMode::Parallel)
//!     .max_batch_size(100)
//!     .build()
//!     .await?;
//!
//! server.run().await
//! # }
//! ```

use crate::{
    BatchMode, Dispatcher, Handler, JrpcServer, MethodDefinition, MethodRegistry, ServerMetrics,
};
use jrpc_core::{Error, Result};
use std::net::SocketAddr;
use std::sync::Arc;

/// Default limit for request bodies: 1 MiB
pub const DEFAULT_MAX_BODY_BYTES: u64 = 1024 * 1024;

/// Builder for [`JrpcServer`]
pub struct ServerBuilder {
    addr: Option<SocketAddr>,
    endpoint: String,
    registry: MethodRegistry,
    registration_error: Option<Error>,
    batch_mode: BatchMode,
    max_batch_size: Option<usize>,
    max_body_bytes: u64,
    observability_config: Option<jrpc_core::ObservabilityConfig>,
    service_name: Option<String>,
}

impl ServerBuilder {
    /// Create a new server builder
    pub fn new() -> Self {
        Self {
            addr: None,
            endpoint: "/".to_string(),
            registry: MethodRegistry::new(),
            registration_error: None,
            batch_mode: BatchMode::default(),
            max_batch_size: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            observability_config: None,
            service_name: None,
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: impl Into<SocketAddr>) -> Self {
        self.addr = Some(addr.into());
        self
    }

    /// Set the bind address from a string (e.g. "127.0.0.1:8080")
    pub fn bind_str(mut self, addr: &str) -> Result<Self> {
        let addr: SocketAddr = addr
            .parse()
            .map_err(|e| Error::InvalidArgument(format!("Invalid address: {}", e)))?;
        self.addr = Some(addr);
        Ok(self)
    }

    /// Path serving GET (introspection) and POST (calls), `/` by default
    pub fn endpoint(mut self, path: impl Into<String>) -> Self {
        self.endpoint = path.into();
        self
    }

    /// Register a method definition (or a `(name, handler[, params])` tuple)
    pub fn method(mut self, definition: impl Into<MethodDefinition>) -> Self {
        if let Err(e) = self.registry.add(definition) {
            self.registration_error.get_or_insert(e);
        }
        self
    }

    /// Register a handler under `name`
    pub fn handler(self, name: impl Into<String>, handler: impl Handler + 'static) -> Self {
        self.method(MethodDefinition::new(name, handler))
    }

    /// Register several methods, all or nothing
    pub fn methods<I, D>(mut self, definitions: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<MethodDefinition>,
    {
        if let Err(e) = self.registry.add_all(definitions) {
            self.registration_error.get_or_insert(e);
        }
        self
    }

    /// Replace the registry (drops previously registered methods)
    pub fn registry(mut self, registry: MethodRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Set the batch execution mode
    pub fn batch_mode(mut self, mode: BatchMode) -> Self {
        self.batch_mode = mode;
        self
    }

    /// Set the maximum number of items per batch
    pub fn max_batch_size(mut self, max_size: usize) -> Self {
        self.max_batch_size = Some(max_size);
        self
    }

    /// Set the maximum request body size in bytes
    pub fn max_body_bytes(mut self, limit: u64) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Enable observability with a custom configuration
    pub fn with_observability(mut self, config: jrpc_core::ObservabilityConfig) -> Self {
        self.observability_config = Some(config);
        self
    }

    /// Enable observability with the default configuration
    pub fn with_default_observability(mut self) -> Self {
        self.observability_config = Some(jrpc_core::ObservabilityConfig::default());
        self
    }

    /// Service name used when observability is enabled
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    /// Build the transport-independent dispatcher only
    ///
    /// Observability settings are ignored; use this to embed the engine in
    /// another HTTP stack.
    pub fn build_dispatcher(self) -> Result<Dispatcher> {
        if let Some(e) = self.registration_error {
            return Err(e);
        }
        Ok(Dispatcher::new(self.registry)
            .with_batch_mode(self.batch_mode)
            .with_max_batch_size(self.max_batch_size))
    }

    /// Initialize observability, bind the listener and return the server
    pub async fn build(self) -> Result<JrpcServer> {
        if let Some(e) = self.registration_error {
            return Err(e);
        }
        let addr = self
            .addr
            .ok_or_else(|| Error::InvalidArgument("No bind address specified".to_string()))?;

        let metrics = if let Some(mut config) = self.observability_config {
            if let Some(name) = self.service_name {
                config.service_name = name;
            }
            jrpc_core::init_observability(config.clone())?;
            Some(Arc::new(ServerMetrics::new(&config.service_name)))
        } else {
            None
        };

        let dispatcher = Dispatcher::new(self.registry)
            .with_batch_mode(self.batch_mode)
            .with_max_batch_size(self.max_batch_size)
            .with_metrics(metrics);

        JrpcServer::bind(addr, &self.endpoint, self.max_body_bytes, dispatcher)
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
