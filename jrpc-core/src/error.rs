//! Error taxonomy for jrpc
//!
//! JSON-RPC failures fall into three disjoint families, each with its own
//! fixed table of symbolic codes, numeric codes and default messages:
//!
//! - **Protocol**: the generic base error (`E_JSONRPC20`, -32000). It is the
//!   fallback for numeric codes no family knows about.
//! - **Server**: the errors pre-registered by the JSON-RPC 2.0 specification
//!   plus the server-defined "Application error" (-32099) that wraps every
//!   failure raised by a method handler.
//! - **Client**: failures the client detects locally (bad response, id
//!   mismatch, unparsable body). These never cross the wire.
//!
//! All family tables are collected once into the [`ErrorRegistry`], which
//! checks that no numeric code belongs to two families.
//!
//! # Messages
//!
//! A custom message never replaces the default one, it is appended to it:
//! `"Method not found: calculate"`. A custom message that already starts with
//! the default message is kept as-is, so messages received from a peer are
//! not prefixed twice.
//!
//! # Examples
//!
//! ```rust
//! use jrpc_core::{Id, ServerError, ServerErrorKind};
//!
//! let error = ServerError::method_not_found("calculate").with_id(Id::Number(7));
//! assert_eq!(error.code(), -32601);
//! assert_eq!(error.message(), "Method not found: calculate");
//! assert_eq!(error.kind(), ServerErrorKind::MethodNotFound);
//!
//! // Reverse lookup by numeric code
//! let parsed = ServerError::from_code(-32700, Some("Parse error"));
//! assert_eq!(parsed.kind(), ServerErrorKind::ParseError);
//! assert_eq!(parsed.message(), "Parse error");
//! ```

use crate::types::{Id, JsonRpcResponse};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};
use thiserror::Error;

/// Result type for jrpc operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for jrpc operations
///
/// Everything the client or the server can fail with ends up here. Protocol
/// failures keep their typed form ([`ServerError`], [`ClientError`]) so callers
/// can inspect the symbolic kind, the numeric code, the request id and the
/// `data` payload.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Error reported by the remote server, or produced by the dispatcher
    #[error(transparent)]
    Server(#[from] ServerError),

    /// Error detected locally by the client while validating a response
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Failure of the underlying transport, passed through untouched
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Serialization or deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid argument given to a registration or configuration call
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Input/output error
    #[error("IO error: {0}")]
    Io(String),

    /// Unexpected internal failure (e.g. telemetry bootstrap)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Wrap an arbitrary transport failure
    pub fn transport<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Transport(TransportError::new(error))
    }

    /// Numeric JSON-RPC code of this error, if it belongs to an error family
    pub fn code(&self) -> Option<i32> {
        match self {
            Error::Server(e) => Some(e.code()),
            Error::Client(e) => Some(e.code()),
            _ => None,
        }
    }

    /// Symbolic code of this error, if it belongs to an error family
    pub fn symbol(&self) -> Option<&'static str> {
        match self {
            Error::Server(e) => Some(e.kind().symbol()),
            Error::Client(e) => Some(e.kind().symbol()),
            _ => None,
        }
    }

    /// Borrow the server error, if this is one
    pub fn as_server(&self) -> Option<&ServerError> {
        match self {
            Error::Server(e) => Some(e),
            _ => None,
        }
    }

    /// Borrow the client error, if this is one
    pub fn as_client(&self) -> Option<&ClientError> {
        match self {
            Error::Client(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

/// Transport-level failure (connection refused, DNS, TLS, HTTP status, ...)
///
/// The original error is kept behind an `Arc` so the top-level [`Error`]
/// stays `Clone`. Its `Display` and `source()` are those of the original.
#[derive(Clone)]
pub struct TransportError {
    inner: Arc<dyn std::error::Error + Send + Sync>,
}

impl TransportError {
    /// Wrap a transport error
    pub fn new<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(error),
        }
    }

    /// Build a transport error from a plain description
    pub fn message(msg: impl Into<String>) -> Self {
        Self::new(TransportMessage(msg.into()))
    }

    /// Access the original error
    pub fn get_ref(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        &*self.inner
    }

    /// Try to downcast the original error to a concrete type
    pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.inner.downcast_ref::<E>()
    }
}

impl fmt::Debug for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.inner, f)
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.inner, f)
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner.source()
    }
}

#[derive(Debug, Error)]
#[error("{0}")]
struct TransportMessage(String);

// ---------------------------------------------------------------------------
// Error families
// ---------------------------------------------------------------------------

/// The three disjoint error families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorFamily {
    /// Generic protocol errors
    Protocol,
    /// Errors produced by a server and sent over the wire
    Server,
    /// Errors detected locally by a client
    Client,
}

/// Common interface of the per-family error kind enums
///
/// Each family is a fieldless enum with a fixed table. `REGISTERED` lists the
/// kinds owning a numeric code in this family; `FALLBACK` is the kind used when
/// a numeric code is unknown to the family.
pub trait ErrorKind: Copy + Eq + fmt::Debug + Send + Sync + 'static {
    /// Family this table belongs to
    const FAMILY: ErrorFamily;
    /// Kind used for unknown numeric codes
    const FALLBACK: Self;
    /// Kinds registered in this family's numeric pool
    const REGISTERED: &'static [Self];

    /// Symbolic code, e.g. `E_JSONRPC20_METHOD_NOT_FOUND`
    fn symbol(self) -> &'static str;
    /// Numeric code
    fn code(self) -> i32;
    /// Default message
    fn default_message(self) -> &'static str;

    /// Reverse lookup by numeric code within this family
    fn from_code(code: i32) -> Option<Self> {
        Self::REGISTERED.iter().copied().find(|k| k.code() == code)
    }

    /// Lookup by symbolic code within this family
    fn from_symbol(symbol: &str) -> Option<Self> {
        Self::REGISTERED.iter().copied().find(|k| k.symbol() == symbol)
    }
}

/// Protocol (base) family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolErrorKind {
    /// `E_JSONRPC20` (-32000)
    Protocol,
}

impl ErrorKind for ProtocolErrorKind {
    const FAMILY: ErrorFamily = ErrorFamily::Protocol;
    const FALLBACK: Self = ProtocolErrorKind::Protocol;
    const REGISTERED: &'static [Self] = &[ProtocolErrorKind::Protocol];

    fn symbol(self) -> &'static str {
        "E_JSONRPC20"
    }

    fn code(self) -> i32 {
        -32000
    }

    fn default_message(self) -> &'static str {
        "Json RPC 2.0 protocol error"
    }
}

/// Server family
///
/// `Protocol` is not part of the server pool; it is the fallback for codes
/// the server table does not know (custom application codes, for example)
/// and shares the base protocol record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerErrorKind {
    /// Unknown code, falls back to the base protocol error
    Protocol,
    /// Failure raised by a method handler (-32099). Details go in `data`.
    ApplicationError,
    /// The JSON sent is not a valid Request object (-32600)
    InvalidRequest,
    /// The method does not exist / is not available (-32601)
    MethodNotFound,
    /// Invalid method parameter(s) (-32602)
    InvalidParams,
    /// Internal JSON-RPC error (-32603)
    InternalError,
    /// Invalid JSON was received by the server (-32700)
    ParseError,
}

impl ErrorKind for ServerErrorKind {
    const FAMILY: ErrorFamily = ErrorFamily::Server;
    const FALLBACK: Self = ServerErrorKind::Protocol;
    const REGISTERED: &'static [Self] = &[
        ServerErrorKind::ApplicationError,
        ServerErrorKind::InvalidRequest,
        ServerErrorKind::MethodNotFound,
        ServerErrorKind::InvalidParams,
        ServerErrorKind::InternalError,
        ServerErrorKind::ParseError,
    ];

    fn symbol(self) -> &'static str {
        match self {
            ServerErrorKind::Protocol => ProtocolErrorKind::Protocol.symbol(),
            ServerErrorKind::ApplicationError => "E_JSONRPC20_APPLICATION_ERROR",
            ServerErrorKind::InvalidRequest => "E_JSONRPC20_INVALID_REQUEST",
            ServerErrorKind::MethodNotFound => "E_JSONRPC20_METHOD_NOT_FOUND",
            ServerErrorKind::InvalidParams => "E_JSONRPC20_INVALID_PARAMS",
            ServerErrorKind::InternalError => "E_JSONRPC20_INTERNAL_ERROR",
            ServerErrorKind::ParseError => "E_JSONRPC20_PARSE_ERROR",
        }
    }

    fn code(self) -> i32 {
        match self {
            ServerErrorKind::Protocol => ProtocolErrorKind::Protocol.code(),
            ServerErrorKind::ApplicationError => -32099,
            ServerErrorKind::InvalidRequest => -32600,
            ServerErrorKind::MethodNotFound => -32601,
            ServerErrorKind::InvalidParams => -32602,
            ServerErrorKind::InternalError => -32603,
            ServerErrorKind::ParseError => -32700,
        }
    }

    fn default_message(self) -> &'static str {
        match self {
            ServerErrorKind::Protocol => ProtocolErrorKind::Protocol.default_message(),
            ServerErrorKind::ApplicationError => "Application error",
            ServerErrorKind::InvalidRequest => "Invalid Request",
            ServerErrorKind::MethodNotFound => "Method not found",
            ServerErrorKind::InvalidParams => "Invalid params",
            ServerErrorKind::InternalError => "Internal error",
            ServerErrorKind::ParseError => "Parse error",
        }
    }
}

/// Client family (never transmitted)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientErrorKind {
    /// Unknown code, falls back to the base protocol error
    Protocol,
    /// The body is absent, empty or not a valid Response object (-31600)
    InvalidResponse,
    /// The response id differs from the request id (-31601)
    MismatchedIds,
    /// The body is not valid JSON (-31700)
    ResponseParseError,
}

impl ErrorKind for ClientErrorKind {
    const FAMILY: ErrorFamily = ErrorFamily::Client;
    const FALLBACK: Self = ClientErrorKind::Protocol;
    const REGISTERED: &'static [Self] = &[
        ClientErrorKind::InvalidResponse,
        ClientErrorKind::MismatchedIds,
        ClientErrorKind::ResponseParseError,
    ];

    fn symbol(self) -> &'static str {
        match self {
            ClientErrorKind::Protocol => ProtocolErrorKind::Protocol.symbol(),
            ClientErrorKind::InvalidResponse => "E_JSONRPC20_INVALID_RESPONSE",
            ClientErrorKind::MismatchedIds => "E_JSONRPC20_MISMATCHED_IDS",
            ClientErrorKind::ResponseParseError => "E_JSONRPC20_RESPONSE_PARSE_ERROR",
        }
    }

    fn code(self) -> i32 {
        match self {
            ClientErrorKind::Protocol => ProtocolErrorKind::Protocol.code(),
            ClientErrorKind::InvalidResponse => -31600,
            ClientErrorKind::MismatchedIds => -31601,
            ClientErrorKind::ResponseParseError => -31700,
        }
    }

    fn default_message(self) -> &'static str {
        match self {
            ClientErrorKind::Protocol => ProtocolErrorKind::Protocol.default_message(),
            ClientErrorKind::InvalidResponse => "Invalid response",
            ClientErrorKind::MismatchedIds => "Mismatched IDs",
            ClientErrorKind::ResponseParseError => "Response parse error",
        }
    }
}

/// One row of an error family table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorRecord {
    /// Owning family
    pub family: ErrorFamily,
    /// Symbolic code
    pub symbol: &'static str,
    /// Numeric code
    pub code: i32,
    /// Default message
    pub default_message: &'static str,
}

impl ErrorRecord {
    fn of<K: ErrorKind>(kind: K) -> Self {
        Self {
            family: K::FAMILY,
            symbol: kind.symbol(),
            code: kind.code(),
            default_message: kind.default_message(),
        }
    }
}

/// Registry of every error family, keyed by numeric code
///
/// Built once on first use. Codes are disjoint across families; a collision
/// is reported through `tracing` and the first registration wins.
#[derive(Debug)]
pub struct ErrorRegistry {
    by_code: HashMap<i32, ErrorRecord>,
}

static REGISTRY: LazyLock<ErrorRegistry> = LazyLock::new(ErrorRegistry::build);

impl ErrorRegistry {
    /// The process-wide registry
    pub fn global() -> &'static ErrorRegistry {
        &REGISTRY
    }

    fn build() -> Self {
        let mut registry = Self {
            by_code: HashMap::new(),
        };
        registry.register::<ProtocolErrorKind>();
        registry.register::<ServerErrorKind>();
        registry.register::<ClientErrorKind>();
        registry
    }

    fn register<K: ErrorKind>(&mut self) {
        for kind in K::REGISTERED {
            let record = ErrorRecord::of(*kind);
            if let Some(existing) = self.by_code.get(&record.code) {
                tracing::error!(
                    code = record.code,
                    existing = existing.symbol,
                    duplicate = record.symbol,
                    "Error code registered by two families"
                );
                continue;
            }
            self.by_code.insert(record.code, record);
        }
    }

    /// Find the record owning a numeric code
    pub fn lookup(&self, code: i32) -> Option<&ErrorRecord> {
        self.by_code.get(&code)
    }

    /// Family owning a numeric code
    pub fn family_of(&self, code: i32) -> Option<ErrorFamily> {
        self.lookup(code).map(|r| r.family)
    }

    /// All records of one family, sorted by descending code
    pub fn records(&self, family: ErrorFamily) -> Vec<ErrorRecord> {
        let mut records: Vec<_> = self
            .by_code
            .values()
            .filter(|r| r.family == family)
            .copied()
            .collect();
        records.sort_by(|a, b| b.code.cmp(&a.code));
        records
    }
}

/// Combine a default message with an optional custom one
///
/// `None` or an empty custom message yields the default. A custom message
/// already starting with the default is returned unchanged.
pub fn compose_message(default: &str, custom: Option<&str>) -> String {
    match custom {
        None => default.to_string(),
        Some(msg) if msg.is_empty() => default.to_string(),
        Some(msg) if msg.starts_with(default) => msg.to_string(),
        Some(msg) => format!("{}: {}", default, msg),
    }
}

// ---------------------------------------------------------------------------
// Wire error object
// ---------------------------------------------------------------------------

/// JSON-RPC 2.0 error object, exactly as it appears in the `error` member
///
/// `code` and `message` are always serialized; `data` only when present.
///
/// # Examples
///
/// ```rust
/// use jrpc_core::JsonRpcErrorData;
/// use serde_json::json;
///
/// let error = JsonRpcErrorData::with_data(-32099, "Application error", json!("boom"));
/// let text = serde_json::to_string(&error).unwrap();
/// assert_eq!(text, r#"{"code":-32099,"message":"Application error","data":"boom"}"#);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorData {
    /// Numeric error code
    pub code: i32,
    /// Human-readable error message
    pub message: String,
    /// Optional additional information
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcErrorData {
    /// Create an error object with code and message
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Create an error object carrying `data`
    pub fn with_data(code: i32, message: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            code,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl fmt::Display for JsonRpcErrorData {
    /// Formats as "[code] message"
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for JsonRpcErrorData {}

// ---------------------------------------------------------------------------
// Server errors
// ---------------------------------------------------------------------------

/// Error of the server family
///
/// Produced by the dispatcher (framing, lookup and handler failures) and
/// rebuilt by the client from the `error` member of a response. Besides the
/// kind it keeps the numeric code actually seen, which differs from the
/// kind's code only for the `Protocol` fallback.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ServerError {
    kind: ServerErrorKind,
    code: i32,
    message: String,
    id: Id,
    data: Option<serde_json::Value>,
}

impl ServerError {
    /// Error of the given kind with its default message
    pub fn new(kind: ServerErrorKind) -> Self {
        Self::with_message(kind, None::<&str>)
    }

    /// Error of the given kind with a custom message appended
    pub fn with_message<S: AsRef<str>>(kind: ServerErrorKind, msg: Option<S>) -> Self {
        Self {
            kind,
            code: kind.code(),
            message: compose_message(kind.default_message(), msg.as_ref().map(|m| m.as_ref())),
            id: Id::Null,
            data: None,
        }
    }

    /// Build an error from a numeric code (reverse lookup)
    ///
    /// Unknown codes map to the `Protocol` kind but keep their numeric value.
    pub fn from_code(code: i32, msg: Option<&str>) -> Self {
        let kind = ServerErrorKind::from_code(code).unwrap_or(ServerErrorKind::FALLBACK);
        Self {
            kind,
            code,
            message: compose_message(kind.default_message(), msg),
            id: Id::Null,
            data: None,
        }
    }

    /// Rebuild a server error from a wire error object
    pub fn from_error_data(error: JsonRpcErrorData, id: Id) -> Self {
        let mut e = Self::from_code(error.code, Some(&error.message)).with_id(id);
        e.data = error.data;
        e
    }

    /// -32700
    pub fn parse_error() -> Self {
        Self::new(ServerErrorKind::ParseError)
    }

    /// -32600
    pub fn invalid_request() -> Self {
        Self::new(ServerErrorKind::InvalidRequest)
    }

    /// -32601, the method name goes into the message
    pub fn method_not_found(method: impl AsRef<str>) -> Self {
        Self::with_message(ServerErrorKind::MethodNotFound, Some(method))
    }

    /// -32602
    pub fn invalid_params(msg: impl AsRef<str>) -> Self {
        Self::with_message(ServerErrorKind::InvalidParams, Some(msg))
    }

    /// -32603
    pub fn internal_error(msg: impl AsRef<str>) -> Self {
        Self::with_message(ServerErrorKind::InternalError, Some(msg))
    }

    /// -32099, the handler failure description goes into `data`
    pub fn application_error(data: serde_json::Value) -> Self {
        Self::new(ServerErrorKind::ApplicationError).with_data(data)
    }

    /// Attach the originating request id
    pub fn with_id(mut self, id: Id) -> Self {
        self.id = id;
        self
    }

    /// Attach a `data` payload
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Symbolic kind
    pub fn kind(&self) -> ServerErrorKind {
        self.kind
    }

    /// Numeric code
    pub fn code(&self) -> i32 {
        self.code
    }

    /// Full message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Originating request id (`Id::Null` when unknown)
    pub fn id(&self) -> &Id {
        &self.id
    }

    /// Optional `data` payload
    pub fn data(&self) -> Option<&serde_json::Value> {
        self.data.as_ref()
    }

    /// Wire error object
    pub fn to_error_data(&self) -> JsonRpcErrorData {
        JsonRpcErrorData {
            code: self.code,
            message: self.message.clone(),
            data: self.data.clone(),
        }
    }

    /// Complete error response, `id` included even when null
    pub fn into_response(self) -> JsonRpcResponse {
        let data = self.to_error_data();
        JsonRpcResponse::error(data, self.id)
    }
}

// ---------------------------------------------------------------------------
// Client errors
// ---------------------------------------------------------------------------

/// Error of the client family, raised locally and never serialized
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ClientError {
    kind: ClientErrorKind,
    code: i32,
    message: String,
}

impl ClientError {
    /// Error of the given kind with its default message
    pub fn new(kind: ClientErrorKind) -> Self {
        Self::with_message(kind, None::<&str>)
    }

    /// Error of the given kind with a custom message appended
    pub fn with_message<S: AsRef<str>>(kind: ClientErrorKind, msg: Option<S>) -> Self {
        Self {
            kind,
            code: kind.code(),
            message: compose_message(kind.default_message(), msg.as_ref().map(|m| m.as_ref())),
        }
    }

    /// Build an error from a numeric code (reverse lookup)
    pub fn from_code(code: i32, msg: Option<&str>) -> Self {
        let kind = ClientErrorKind::from_code(code).unwrap_or(ClientErrorKind::FALLBACK);
        Self {
            kind,
            code,
            message: compose_message(kind.default_message(), msg),
        }
    }

    /// -31600
    pub fn invalid_response() -> Self {
        Self::new(ClientErrorKind::InvalidResponse)
    }

    /// -31601, both ids go into the message
    pub fn mismatched_ids(request: &Id, response: &Id) -> Self {
        Self::with_message(
            ClientErrorKind::MismatchedIds,
            Some(format!("request id {}; response id {}", request, response)),
        )
    }

    /// -31700, the parser's message goes into the message
    pub fn response_parse_error(detail: impl AsRef<str>) -> Self {
        Self::with_message(ClientErrorKind::ResponseParseError, Some(detail))
    }

    /// Symbolic kind
    pub fn kind(&self) -> ClientErrorKind {
        self.kind
    }

    /// Numeric code
    pub fn code(&self) -> i32 {
        self.code
    }

    /// Full message
    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_registered_server_codes() {
        let expected = [
            (ServerErrorKind::ParseError, -32700, "Parse error"),
            (ServerErrorKind::InvalidRequest, -32600, "Invalid Request"),
            (ServerErrorKind::MethodNotFound, -32601, "Method not found"),
            (ServerErrorKind::InvalidParams, -32602, "Invalid params"),
            (ServerErrorKind::InternalError, -32603, "Internal error"),
            (ServerErrorKind::ApplicationError, -32099, "Application error"),
        ];

        for (kind, code, message) in expected {
            let error = ServerError::new(kind);
            assert_eq!(error.code(), code);
            assert_eq!(error.message(), message);
            assert_eq!(ServerErrorKind::from_code(code), Some(kind));
        }
    }

    #[test]
    fn test_client_codes() {
        assert_eq!(ClientError::invalid_response().code(), -31600);
        assert_eq!(ClientError::invalid_response().message(), "Invalid response");
        assert_eq!(
            ClientErrorKind::from_code(-31601),
            Some(ClientErrorKind::MismatchedIds)
        );
        assert_eq!(
            ClientErrorKind::from_code(-31700),
            Some(ClientErrorKind::ResponseParseError)
        );
    }

    #[test]
    fn test_compose_message() {
        assert_eq!(compose_message("Parse error", None), "Parse error");
        assert_eq!(compose_message("Parse error", Some("")), "Parse error");
        assert_eq!(
            compose_message("Method not found", Some("sum")),
            "Method not found: sum"
        );
        // No duplicated prefix for messages coming back from a peer
        assert_eq!(
            compose_message("Method not found", Some("Method not found: sum")),
            "Method not found: sum"
        );
    }

    #[test]
    fn test_unknown_code_falls_back_to_protocol() {
        let error = ServerError::from_code(1001, Some("Insufficient funds"));
        assert_eq!(error.kind(), ServerErrorKind::Protocol);
        assert_eq!(error.code(), 1001);
        assert_eq!(
            error.message(),
            "Json RPC 2.0 protocol error: Insufficient funds"
        );

        let client = ClientError::from_code(7, None);
        assert_eq!(client.kind(), ClientErrorKind::Protocol);
        assert_eq!(client.message(), "Json RPC 2.0 protocol error");
    }

    #[test]
    fn test_lookup_by_symbol() {
        assert_eq!(
            ServerErrorKind::from_symbol("E_JSONRPC20_INVALID_PARAMS"),
            Some(ServerErrorKind::InvalidParams)
        );
        assert_eq!(ServerErrorKind::from_symbol("E_UNKNOWN"), None);
    }

    #[test]
    fn test_registry_families_are_disjoint() {
        let registry = ErrorRegistry::global();

        assert_eq!(registry.family_of(-32000), Some(ErrorFamily::Protocol));
        assert_eq!(registry.family_of(-32601), Some(ErrorFamily::Server));
        assert_eq!(registry.family_of(-31601), Some(ErrorFamily::Client));
        assert_eq!(registry.family_of(42), None);

        let server = registry.records(ErrorFamily::Server);
        let client = registry.records(ErrorFamily::Client);
        assert_eq!(server.len(), ServerErrorKind::REGISTERED.len());
        assert_eq!(client.len(), ClientErrorKind::REGISTERED.len());
        assert!(server.iter().all(|s| client.iter().all(|c| c.code != s.code)));
    }

    #[test]
    fn test_server_error_response_keeps_null_id() {
        let response = ServerError::parse_error().into_response();
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(
            value,
            json!({
                "jsonrpc": "2.0",
                "error": {"code": -32700, "message": "Parse error"},
                "id": null
            })
        );
    }

    #[test]
    fn test_application_error_carries_data() {
        let error = ServerError::application_error(json!({"name": "Error", "message": "boom"}))
            .with_id(Id::from("abc-1"));

        assert_eq!(error.code(), -32099);
        assert_eq!(error.id(), &Id::from("abc-1"));
        assert_eq!(error.data().unwrap()["message"], "boom");
    }

    #[test]
    fn test_from_error_data_roundtrip() {
        let wire = JsonRpcErrorData::with_data(-32601, "Method not found: ping", json!(1));
        let error = ServerError::from_error_data(wire.clone(), Id::Number(3));

        assert_eq!(error.kind(), ServerErrorKind::MethodNotFound);
        assert_eq!(error.message(), "Method not found: ping");
        assert_eq!(error.to_error_data(), wire);
    }

    #[test]
    fn test_mismatched_ids_message() {
        let error = ClientError::mismatched_ids(&Id::from("a-1"), &Id::from("a-2"));
        assert_eq!(
            error.message(),
            "Mismatched IDs: request id \"a-1\"; response id \"a-2\""
        );
    }

    #[test]
    fn test_top_level_error_accessors() {
        let error: Error = ServerError::method_not_found("x").into();
        assert_eq!(error.code(), Some(-32601));
        assert_eq!(error.symbol(), Some("E_JSONRPC20_METHOD_NOT_FOUND"));
        assert!(error.as_server().is_some());
        assert!(error.as_client().is_none());

        let transport = Error::Transport(TransportError::message("connection refused"));
        assert_eq!(transport.code(), None);
        assert_eq!(transport.to_string(), "connection refused");
    }

    #[test]
    fn test_transport_error_downcast() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let error = TransportError::new(io);
        assert!(error.downcast_ref::<std::io::Error>().is_some());
        assert_eq!(error.to_string(), "refused");
    }
}
