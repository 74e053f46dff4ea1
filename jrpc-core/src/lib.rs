//! Core JSON-RPC 2.0 building blocks for jrpc
//!
//! This crate holds everything the client and the server share:
//!
//! - **Error taxonomy**: the protocol, server and client error families with
//!   their symbolic codes, numeric codes and default messages
//! - **Types**: requests, notifications, responses, ids, params and method
//!   descriptors
//! - **Codec**: payload decoding with the protocol's parse/framing rules
//! - **Observability**: `tracing` subscriber and OpenTelemetry bootstrap
//!
//! It is transport-agnostic. `jrpc-server` and `jrpc-client` bind it to HTTP.
//!
//! # Example
//!
//! ```rust
//! use jrpc_core::{codec, Id, JsonRpcRequest, Params, ServerError};
//! use serde_json::json;
//!
//! let request = JsonRpcRequest::new("sum", Params::from(json!([1, 2])), Id::from("c0ffee-1"));
//! let bytes = codec::encode(&request).unwrap();
//! assert!(codec::decode(&bytes).is_ok());
//!
//! let response = ServerError::method_not_found("sum").with_id(request.id).into_response();
//! assert_eq!(response.error.unwrap().code, -32601);
//! ```

pub mod codec;
pub mod error;
pub mod observability;
pub mod types;

pub use error::{
    compose_message, ClientError, ClientErrorKind, Error, ErrorFamily, ErrorKind, ErrorRecord,
    ErrorRegistry, JsonRpcErrorData, ProtocolErrorKind, Result, ServerError, ServerErrorKind,
    TransportError,
};
pub use observability::{init_observability, shutdown_observability, LogFormat, ObservabilityConfig};
pub use types::{
    Id, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, MethodDescriptor, Params,
    JSONRPC_VERSION,
};
