//! Codec for JSON-RPC payloads
//!
//! Both ends of a connection exchange raw bodies. This module turns them into
//! JSON values and maps every failure onto the error taxonomy:
//!
//! - inbound request payloads ([`decode`]): invalid JSON, an empty body or a
//!   literal `null` give a server "Parse error" (-32700); an empty array gives
//!   "Invalid Request" (-32600);
//! - inbound response bodies ([`decode_response_body`]): an empty body is not
//!   an error (notifications are answered with nothing), invalid JSON gives a
//!   client "Response parse error" (-31700).
//!
//! Individual items of a batch are left as raw values so that one malformed
//! item does not prevent the others from being processed.
//!
//! # Examples
//!
//! ```rust
//! use jrpc_core::codec::{self, Payload};
//!
//! let payload = codec::decode(br#"[{"jsonrpc":"2.0","method":"a","id":1}]"#).unwrap();
//! assert!(matches!(payload, Payload::Batch(ref items) if items.len() == 1));
//!
//! let error = codec::decode(b"{oops").unwrap_err();
//! assert_eq!(error.code(), -32700);
//! ```

use crate::error::{ClientError, Error, Result, ServerError};
use serde::Serialize;
use serde_json::Value;

/// A decoded inbound payload
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// A single JSON value (not an array)
    Single(Value),
    /// A non-empty JSON array
    Batch(Vec<Value>),
}

impl Payload {
    /// Whether the payload was sent as an array
    pub fn is_batch(&self) -> bool {
        matches!(self, Payload::Batch(_))
    }

    /// Items in submission order; a single payload is a batch of one
    pub fn into_items(self) -> Vec<Value> {
        match self {
            Payload::Single(value) => vec![value],
            Payload::Batch(items) => items,
        }
    }
}

/// Decode an inbound request payload
///
/// # Errors
///
/// - "Parse error" when `data` is empty, not JSON, or the JSON `null`
/// - "Invalid Request" when `data` is an empty array
pub fn decode(data: &[u8]) -> std::result::Result<Payload, ServerError> {
    let value: Value = serde_json::from_slice(data).map_err(|e| {
        tracing::debug!(error = %e, "Failed to parse request payload");
        ServerError::parse_error()
    })?;

    match value {
        Value::Null => Err(ServerError::parse_error()),
        Value::Array(items) if items.is_empty() => Err(ServerError::invalid_request()),
        Value::Array(items) => Ok(Payload::Batch(items)),
        other => Ok(Payload::Single(other)),
    }
}

/// Decode a response body received by a client
///
/// Returns `Ok(None)` for an empty (or whitespace only) body.
pub fn decode_response_body(data: &[u8]) -> std::result::Result<Option<Value>, ClientError> {
    if data.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(data)
        .map(Some)
        .map_err(|e| ClientError::response_parse_error(e.to_string()))
}

/// Encode any serializable message to bytes
pub fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(msg).map_err(|e| Error::Serialization(e.to_string()))
}

/// Encode any serializable message to a string
pub fn encode_string<T: Serialize>(msg: &T) -> Result<String> {
    serde_json::to_string(msg).map_err(|e| Error::Serialization(e.to_string()))
}
