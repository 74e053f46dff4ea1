//! JSON-RPC 2.0 message types
//!
//! Typed forms of everything that travels on the wire:
//!
//! 1. **Request**: a call expecting a response, correlated by its `id`
//! 2. **Notification**: a call without `id`, never answered
//! 3. **Response**: exactly one of `result` or `error`, plus the request `id`
//!
//! plus the [`MethodDescriptor`] list returned by method introspection.
//!
//! # Parameters
//!
//! [`Params`] is either positional (JSON array) or named (JSON object).
//! Handlers read arguments through [`Params::arg`], which accepts both shapes:
//! the argument at `index` for positional params, the member called `name`
//! for named params.
//!
//! ```rust
//! use jrpc_core::Params;
//! use serde_json::json;
//!
//! let positional = Params::from(json!([1, 2, 3]));
//! let named = Params::from(json!({"a": 1, "rest": [2, 3]}));
//!
//! assert_eq!(positional.arg(0, "a"), Some(&json!(1)));
//! assert_eq!(named.arg(0, "a"), Some(&json!(1)));
//! assert_eq!(positional.rest(1, "rest"), vec![json!(2), json!(3)]);
//! assert_eq!(named.rest(1, "rest"), vec![json!(2), json!(3)]);
//! ```

use crate::error::JsonRpcErrorData;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// The only protocol version accepted on the wire
pub const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC 2.0 request id
///
/// Serialized untagged, as the bare string, number or `null`.
///
/// # Examples
///
/// ```rust
/// use jrpc_core::Id;
///
/// let id1: Id = "0a1b-1".into();
/// let id2: Id = 42i64.into();
///
/// assert_eq!(id1.to_string(), "\"0a1b-1\"");
/// assert_eq!(id2.to_string(), "42");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    /// String identifier, the form generated by the client
    String(String),
    /// Integer identifier
    Number(i64),
    /// Null identifier, used on error responses whose request id is unknown
    Null,
}

impl Id {
    /// Read an id from a raw JSON value
    ///
    /// Returns `None` for anything that is not a string, an integer or `null`.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Id::String(s.clone())),
            Value::Number(n) => n.as_i64().map(Id::Number),
            Value::Null => Some(Id::Null),
            _ => None,
        }
    }

    /// Whether this is the null id
    pub fn is_null(&self) -> bool {
        matches!(self, Id::Null)
    }
}

impl Default for Id {
    fn default() -> Self {
        Id::Null
    }
}

impl fmt::Display for Id {
    /// JSON-like rendering: quoted strings, bare numbers, `null`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::String(s) => write!(f, "\"{}\"", s),
            Id::Number(n) => write!(f, "{}", n),
            Id::Null => write!(f, "null"),
        }
    }
}

impl From<String> for Id {
    fn from(s: String) -> Self {
        Id::String(s)
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Id::String(s.to_string())
    }
}

impl From<i64> for Id {
    fn from(n: i64) -> Self {
        Id::Number(n)
    }
}

/// Method parameters, positional or named
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Params {
    /// JSON array
    Positional(Vec<Value>),
    /// JSON object
    Named(Map<String, Value>),
}

impl Default for Params {
    fn default() -> Self {
        Params::Positional(Vec::new())
    }
}

impl Params {
    /// Empty positional parameters
    pub fn none() -> Self {
        Self::default()
    }

    /// Argument by position or by name, depending on the params shape
    pub fn arg(&self, index: usize, name: &str) -> Option<&Value> {
        match self {
            Params::Positional(values) => values.get(index),
            Params::Named(map) => map.get(name),
        }
    }

    /// Remaining arguments, starting at `from` or taken from member `name`
    ///
    /// For named params an array member is expanded, any other present value
    /// becomes a single element.
    pub fn rest(&self, from: usize, name: &str) -> Vec<Value> {
        match self {
            Params::Positional(values) => values.iter().skip(from).cloned().collect(),
            Params::Named(map) => match map.get(name) {
                Some(Value::Array(values)) => values.clone(),
                Some(value) => vec![value.clone()],
                None => Vec::new(),
            },
        }
    }

    /// Number of arguments
    pub fn len(&self) -> usize {
        match self {
            Params::Positional(values) => values.len(),
            Params::Named(map) => map.len(),
        }
    }

    /// Whether there are no arguments at all
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert back into a JSON value (array or object)
    pub fn into_value(self) -> Value {
        match self {
            Params::Positional(values) => Value::Array(values),
            Params::Named(map) => Value::Object(map),
        }
    }
}

impl From<Value> for Params {
    /// Arrays become positional, objects named, `null` empty positional.
    /// Any other scalar becomes a single positional argument.
    fn from(value: Value) -> Self {
        match value {
            Value::Array(values) => Params::Positional(values),
            Value::Object(map) => Params::Named(map),
            Value::Null => Params::default(),
            other => Params::Positional(vec![other]),
        }
    }
}

impl From<Vec<Value>> for Params {
    fn from(values: Vec<Value>) -> Self {
        Params::Positional(values)
    }
}

impl From<Map<String, Value>> for Params {
    fn from(map: Map<String, Value>) -> Self {
        Params::Named(map)
    }
}

/// JSON-RPC 2.0 request message
///
/// `params` is always serialized; an empty call sends `[]`.
///
/// # Examples
///
/// ```rust
/// use jrpc_core::{Id, JsonRpcRequest, Params};
/// use serde_json::json;
///
/// let request = JsonRpcRequest::new("sum", Params::from(json!([1, 2])), Id::from("p-1"));
/// assert_eq!(
///     serde_json::to_value(&request).unwrap(),
///     json!({"jsonrpc": "2.0", "method": "sum", "params": [1, 2], "id": "p-1"})
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Always "2.0"
    pub jsonrpc: String,
    /// Name of the remote method
    pub method: String,
    /// Arguments
    #[serde(default)]
    pub params: Params,
    /// Correlation id
    pub id: Id,
}

impl JsonRpcRequest {
    /// Create a request
    pub fn new(method: impl Into<String>, params: Params, id: Id) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
            id,
        }
    }
}

/// JSON-RPC 2.0 notification message (a request without `id`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    /// Always "2.0"
    pub jsonrpc: String,
    /// Name of the remote method
    pub method: String,
    /// Arguments
    #[serde(default)]
    pub params: Params,
}

impl JsonRpcNotification {
    /// Create a notification
    pub fn new(method: impl Into<String>, params: Params) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC 2.0 response message
///
/// A `null` result is a valid success: on deserialization, a present
/// `"result": null` gives `Some(Value::Null)` while a missing member gives
/// `None`.
///
/// # Examples
///
/// ```rust
/// use jrpc_core::{Id, JsonRpcResponse};
/// use serde_json::json;
///
/// let response: JsonRpcResponse =
///     serde_json::from_value(json!({"jsonrpc": "2.0", "result": null, "id": 1})).unwrap();
/// assert!(response.is_success());
/// assert_eq!(response.id, Id::Number(1));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Always "2.0"
    pub jsonrpc: String,
    /// Present on success
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub result: Option<Value>,
    /// Present on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcErrorData>,
    /// Id of the request, `null` when it could not be determined
    #[serde(default)]
    pub id: Id,
}

fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl JsonRpcResponse {
    /// Successful response
    pub fn success(result: Value, id: Id) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    /// Error response
    pub fn error(error: JsonRpcErrorData, id: Id) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(error),
            id,
        }
    }

    /// `result` is present
    pub fn is_success(&self) -> bool {
        self.result.is_some()
    }

    /// `error` is present
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// One entry of the introspection list: `{name, params}`
///
/// Rest parameters appear as `"...name"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDescriptor {
    /// Method name
    pub name: String,
    /// Declared parameter names, in order
    #[serde(default)]
    pub params: Vec<String>,
}

impl MethodDescriptor {
    /// Create a descriptor
    pub fn new(name: impl Into<String>, params: Vec<String>) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }
}
