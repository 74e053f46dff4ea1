//! JSON-RPC 2.0 server over HTTP
//!
//! This crate provides the server half of jrpc: a method registry with
//! introspection, a transport-independent dispatcher, and an HTTP binding
//! built on `warp`.
//!
//! # Core Features
//!
//! - **Method registry**: name to handler mapping, with declared parameter
//!   names reported by the reserved `rpc:api.description` method and by
//!   `GET <endpoint>`
//! - **Dispatcher**: single and batch payloads, notifications, per-item
//!   validation and error isolation, concurrent batch execution with
//!   responses in submission order
//! - **HTTP binding**: `POST <endpoint>` for calls, `GET <endpoint>` for
//!   descriptors, graceful shutdown
//! - **Observability**: `tracing` spans and OpenTelemetry metrics
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use jrpc_server::{from_sync_fn, from_typed_fn, HandlerError, JrpcServer, MethodDefinition};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> jrpc_core::Result<()> {
//!     let server = JrpcServer::builder()
//!         .bind_str("127.0.0.1:8080")?
//!         .method(
//!             MethodDefinition::new(
//!                 "sum",
//!                 from_typed_fn(|values: Vec<i64>| async move {
//!                     Ok::<_, HandlerError>(values.iter().sum::<i64>())
//!                 }),
//!             )
//!             .rest("values"),
//!         )
//!         .handler("mirror", from_sync_fn(|params| Ok(params.into_value())))
//!         .build()
//!         .await?;
//!
//!     println!("listening on {}", server.url());
//!     server.run().await
//! }
//! ```
//!
//! # Embedding
//!
//! The [`Dispatcher`] works on raw bytes and knows nothing about HTTP. Build
//! one with [`ServerBuilder::build_dispatcher`] to serve JSON-RPC from another
//! framework, or mount [`http::routes`] inside an existing `warp` service.

extern crate self as jrpc_server;

mod builder;
mod dispatcher;
mod handler;
pub mod http;
mod metrics;
mod registry;

pub use builder::{ServerBuilder, DEFAULT_MAX_BODY_BYTES};
pub use dispatcher::{BatchMode, DispatchResponse, Dispatcher};
pub use handler::{
    decode_arg, decode_rest, from_fn, from_sync_fn, from_typed_fn, result_to_value, to_value,
    AsyncHandler, Handler, HandlerError, HandlerFuture, HandlerResult, SyncHandler,
};
pub use jrpc_core::{Id, MethodDescriptor, Params};
pub use metrics::ServerMetrics;
pub use registry::{MethodDefinition, MethodRegistry, Param, DISCOVERY_METHOD};

use jrpc_core::{Error, Result};
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

type ServeFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// JSON-RPC 2.0 server bound to a local address
///
/// The listener is bound when the server is built, so [`local_addr`] is
/// known (useful with port `0`) before requests are served.
///
/// # Lifecycle
///
/// 1. **Build**: configure with [`JrpcServer::builder`] and bind
/// 2. **Serve**: [`run`] in the current task, or [`spawn`] in the background
/// 3. **Stop**: [`ServerHandle::shutdown`] finishes in-flight requests then
///    stops; dropping the handle stops the server the same way
///
/// [`local_addr`]: JrpcServer::local_addr
/// [`run`]: JrpcServer::run
/// [`spawn`]: JrpcServer::spawn
pub struct JrpcServer {
    local_addr: SocketAddr,
    endpoint: String,
    dispatcher: Dispatcher,
    serve: ServeFuture,
    shutdown_tx: oneshot::Sender<()>,
}

impl JrpcServer {
    /// Start configuring a server
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    pub(crate) fn bind(
        addr: SocketAddr,
        endpoint: &str,
        max_body_bytes: u64,
        dispatcher: Dispatcher,
    ) -> Result<Self> {
        let endpoint = http::normalize_endpoint(endpoint);
        let routes = http::routes(dispatcher.clone(), &endpoint, max_body_bytes);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let (local_addr, serve) = warp::serve(routes)
            .try_bind_with_graceful_shutdown(addr, async move {
                let _ = shutdown_rx.await;
            })
            .map_err(|e| Error::Io(format!("Failed to bind {}: {}", addr, e)))?;

        tracing::info!(addr = %local_addr, endpoint = %endpoint, "Server listening");

        Ok(Self {
            local_addr,
            endpoint,
            dispatcher,
            serve: Box::pin(serve),
            shutdown_tx,
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Normalized endpoint path
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Full `http://` URL of the endpoint
    pub fn url(&self) -> String {
        endpoint_url(self.local_addr, &self.endpoint)
    }

    /// The dispatcher behind the HTTP binding
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Serve requests until the process ends
    #[tracing::instrument(skip(self), fields(addr = %self.local_addr))]
    pub async fn run(self) -> Result<()> {
        let Self {
            serve, shutdown_tx, ..
        } = self;
        serve.await;
        drop(shutdown_tx);
        Ok(())
    }

    /// Serve requests on a background task
    pub fn spawn(self) -> ServerHandle {
        let Self {
            local_addr,
            endpoint,
            serve,
            shutdown_tx,
            ..
        } = self;

        ServerHandle {
            local_addr,
            endpoint,
            shutdown_tx: Some(shutdown_tx),
            task: tokio::spawn(serve),
        }
    }
}

/// Handle on a spawned server
pub struct ServerHandle {
    local_addr: SocketAddr,
    endpoint: String,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Full `http://` URL of the endpoint
    pub fn url(&self) -> String {
        endpoint_url(self.local_addr, &self.endpoint)
    }

    /// Stop accepting connections and wait for in-flight requests
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        tracing::info!(addr = %self.local_addr, "Server shutting down");
        self.task
            .await
            .map_err(|e| Error::Internal(format!("server task failed: {}", e)))
    }
}

fn endpoint_url(addr: SocketAddr, endpoint: &str) -> String {
    format!("http://{}{}", addr, endpoint)
}
