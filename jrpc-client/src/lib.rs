//! JSON-RPC 2.0 client engine
//!
//! This crate provides the client half of jrpc. The engine builds request
//! payloads, hands them to a pluggable transport and validates the answers
//! against the protocol.
//!
//! # Core Features
//!
//! - **Calls and notifications**: any `Serialize` value as params, typed
//!   results with [`JrpcClient::call_as`]
//! - **Batches**: calls and notifications in one payload, results in
//!   response order with lookup by id
//! - **Id correlation**: client-unique string ids, mismatches rejected
//! - **Discovery**: the server's methods, callable by name through
//!   [`RemoteMethod`]
//! - **HTTP transport**: `reqwest` with JSON headers, custom headers,
//!   timeouts and TLS verification on by default
//! - **Observability**: `tracing` spans and OpenTelemetry metrics
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use jrpc_client::ClientBuilder;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ClientBuilder::new("http://localhost:8080/").discover().await?;
//!
//!     let total: i64 = client.call_as("sum", (1, 2, 3)).await?;
//!     println!("sum = {}", total);
//!
//!     client.notify("log", json!({"line": "hello"})).await?;
//!
//!     for method in client.methods() {
//!         println!("{}({})", method.name, method.params.join(", "));
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Custom Transport
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use jrpc_client::{JrpcClient, Transport};
//!
//! struct Loopback;
//!
//! #[async_trait]
//! impl Transport for Loopback {
//!     async fn send(&self, _body: Vec<u8>) -> jrpc_core::Result<Vec<u8>> {
//!         Ok(Vec::new())
//!     }
//! }
//!
//! # async fn example() -> jrpc_core::Result<()> {
//! let client = JrpcClient::new(Loopback);
//! client.notify("ping", ()).await?;
//! # Ok(())
//! # }
//! ```

mod batch;
mod client;
mod client_builder;
mod ids;
mod metrics;
mod transport;

pub use batch::{BatchItem, BatchRequest, BatchResponse};
pub use client::{JrpcClient, RemoteMethod, RESERVED_NAMES};
pub use client_builder::ClientBuilder;
pub use ids::IdGenerator;
pub use metrics::ClientMetrics;
pub use transport::{HttpOptions, HttpTransport, Transport};
