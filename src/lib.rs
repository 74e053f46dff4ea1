//! jrpc - JSON-RPC 2.0 over HTTP
//!
//! This is the convenience crate that re-exports all jrpc sub-crates. Use
//! it for a single dependency providing both client and server.
//!
//! # Architecture
//!
//! - **jrpc-core**: error taxonomy, wire types, codec, observability
//! - **jrpc-server**: method registry, dispatcher, HTTP binding
//! - **jrpc-client**: client engine, batches, discovery, HTTP transport
//! - **jrpc-macros**: the `#[method]` attribute
//!
//! # Quick Start - Server
//!
//! ```rust,no_run
//! use jrpc::server::{from_sync_fn, from_typed_fn, HandlerError, MethodDefinition};
//! use jrpc::JrpcServer;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
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
//!     server.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Quick Start - Client
//!
//! ```rust,no_run
//! use jrpc::ClientBuilder;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ClientBuilder::new("http://127.0.0.1:8080/").discover().await?;
//!
//!     let total: i64 = client.call_as("sum", (1, 2, 3)).await?;
//!     println!("sum = {}", total);
//!     Ok(())
//! }
//! ```
//!
//! The `#[method]` attribute expands to paths under `::jrpc_server`, so a
//! crate using it depends on `jrpc-server` directly.

pub use jrpc_client as client;
pub use jrpc_core as core;
pub use jrpc_macros as macros;
pub use jrpc_server as server;

pub use jrpc_client::{ClientBuilder, JrpcClient};
pub use jrpc_core::{ClientError, Error, Id, Params, Result, ServerError};
pub use jrpc_macros::method;
pub use jrpc_server::{JrpcServer, MethodDefinition, ServerBuilder};
