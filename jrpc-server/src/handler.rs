//! Method handlers
//!
//! A [`Handler`] receives the request [`Params`] (positional or named) and
//! produces a JSON value, or fails with a [`HandlerError`]. The dispatcher
//! turns failures into error responses:
//!
//! - [`HandlerError::Failure`] and [`HandlerError::Thrown`] become
//!   "Application error" (-32099) with the failure described in `data`
//! - [`HandlerError::InvalidParams`], raised when typed parameter decoding
//!   fails, becomes "Invalid params" (-32602)
//!
//! # Creating Handlers
//!
//! 1. **from_fn**: async closure over raw [`Params`]
//! 2. **from_sync_fn**: plain closure over raw [`Params`]
//! 3. **from_typed_fn**: async closure over a deserialized parameter type
//! 4. **#[method]**: attribute macro from `jrpc-macros`, which also records
//!    the parameter names for introspection
//!
//! # Examples
//!
//! ```rust
//! use jrpc_server::{from_fn, from_sync_fn, from_typed_fn, HandlerError};
//! use serde_json::{json, Value};
//!
//! let mirror = from_fn(|params| async move { Ok(params.into_value()) });
//!
//! let fail = from_sync_fn(|_params| -> Result<Value, HandlerError> {
//!     Err(HandlerError::new("disk full"))
//! });
//!
//! // Array params decode into tuples, object params into structs
//! let sum = from_typed_fn(|(a, b): (i64, i64)| async move {
//!     Ok::<_, HandlerError>(a + b)
//! });
//! ```

use jrpc_core::{Id, Params, ServerError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

/// Outcome of a handler invocation
pub type HandlerResult = std::result::Result<Value, HandlerError>;

/// Boxed future returned by [`Handler::handle`]
///
/// Boxing gives every handler the same type so they can share one registry.
pub type HandlerFuture = Pin<Box<dyn Future<Output = HandlerResult> + Send>>;

/// Failure of a method handler
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HandlerError {
    /// An error object, reported as `{"name": ..., "message": ...}`
    #[error("{name}: {message}")]
    Failure {
        /// Error type name, `"Error"` unless given
        name: String,
        /// Error description
        message: String,
    },

    /// An arbitrary value, reported as-is
    #[error("{0}")]
    Thrown(Value),

    /// The parameters could not be decoded into the handler's types
    #[error("{0}")]
    InvalidParams(String),
}

impl HandlerError {
    /// Failure named `"Error"` with the given message
    pub fn new(message: impl Into<String>) -> Self {
        Self::named("Error", message)
    }

    /// Failure with a custom type name
    pub fn named(name: impl Into<String>, message: impl Into<String>) -> Self {
        HandlerError::Failure {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Fail with an arbitrary value
    ///
    /// Values that are not valid JSON numbers (NaN, infinities) are already
    /// `null` once converted into a `serde_json::Value`.
    pub fn thrown(value: impl Into<Value>) -> Self {
        HandlerError::Thrown(value.into())
    }

    /// Describe an error object by its message
    pub fn from_error<E: std::error::Error + ?Sized>(error: &E) -> Self {
        Self::new(error.to_string())
    }

    /// The `data` member of the resulting "Application error"
    pub fn into_data(self) -> Value {
        match self {
            HandlerError::Failure { name, message } => json!({"name": name, "message": message}),
            HandlerError::Thrown(value) => value,
            HandlerError::InvalidParams(message) => {
                json!({"name": "InvalidParams", "message": message})
            }
        }
    }

    /// Convert into the server error sent back for request `id`
    pub fn into_server_error(self, id: Id) -> ServerError {
        match self {
            HandlerError::InvalidParams(message) => ServerError::invalid_params(message),
            other => ServerError::application_error(other.into_data()),
        }
        .with_id(id)
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        HandlerError::new(message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        HandlerError::new(message)
    }
}

impl From<jrpc_core::Error> for HandlerError {
    fn from(error: jrpc_core::Error) -> Self {
        HandlerError::from_error(&error)
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(error: serde_json::Error) -> Self {
        HandlerError::named("SerializationError", error.to_string())
    }
}

impl From<std::io::Error> for HandlerError {
    fn from(error: std::io::Error) -> Self {
        HandlerError::named("IoError", error.to_string())
    }
}

/// A JSON-RPC method implementation
///
/// Implementations must be `Send + Sync`: one handler instance serves every
/// request, possibly from several tasks at once.
pub trait Handler: Send + Sync {
    /// Invoke the method
    fn handle(&self, params: Params) -> HandlerFuture;
}

impl<H: Handler + ?Sized> Handler for Box<H> {
    fn handle(&self, params: Params) -> HandlerFuture {
        (**self).handle(params)
    }
}

impl<H: Handler + ?Sized> Handler for Arc<H> {
    fn handle(&self, params: Params) -> HandlerFuture {
        (**self).handle(params)
    }
}

/// Adapter from an async closure to [`Handler`]
pub struct AsyncHandler<F> {
    func: F,
}

impl<F, Fut> Handler for AsyncHandler<F>
where
    F: Fn(Params) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn handle(&self, params: Params) -> HandlerFuture {
        Box::pin((self.func)(params))
    }
}

/// Adapter from a synchronous closure to [`Handler`]
pub struct SyncHandler<F> {
    func: F,
}

impl<F> Handler for SyncHandler<F>
where
    F: Fn(Params) -> HandlerResult + Send + Sync + 'static,
{
    fn handle(&self, params: Params) -> HandlerFuture {
        let result = (self.func)(params);
        Box::pin(std::future::ready(result))
    }
}

/// Create a handler from an async closure over raw params
///
/// # Examples
///
/// ```rust
/// use jrpc_server::from_fn;
///
/// let echo = from_fn(|params| async move {
///     Ok(serde_json::json!({"echo": params.into_value()}))
/// });
/// ```
pub fn from_fn<F, Fut>(func: F) -> Box<dyn Handler>
where
    F: Fn(Params) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Box::new(AsyncHandler { func })
}

/// Create a handler from a synchronous closure over raw params
///
/// The closure runs on the dispatching task; keep it short.
pub fn from_sync_fn<F>(func: F) -> Box<dyn Handler>
where
    F: Fn(Params) -> HandlerResult + Send + Sync + 'static,
{
    Box::new(SyncHandler { func })
}

/// Create a handler that deserializes its params into `P`
///
/// Positional params deserialize from a JSON array (use a tuple or a
/// `Vec`), named params from a JSON object (use a struct or a map). A decoding
/// failure is reported as "Invalid params"; the closure's own errors become
/// "Application error".
///
/// # Examples
///
/// ```rust
/// use jrpc_server::{from_typed_fn, HandlerError};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Transfer {
///     from: String,
///     to: String,
///     amount: u64,
/// }
///
/// let handler = from_typed_fn(|t: Transfer| async move {
///     if t.amount == 0 {
///         return Err(HandlerError::named("ValidationError", "amount must be positive"));
///     }
///     Ok(format!("{} -> {}: {}", t.from, t.to, t.amount))
/// });
/// ```
pub fn from_typed_fn<P, R, E, F, Fut>(func: F) -> Box<dyn Handler>
where
    P: DeserializeOwned + Send + 'static,
    R: Serialize + Send + 'static,
    E: Into<HandlerError> + Send + 'static,
    F: Fn(P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<R, E>> + Send + 'static,
{
    let func = Arc::new(func);

    from_fn(move |params: Params| {
        let func = Arc::clone(&func);
        async move {
            let params: P = serde_json::from_value(params.into_value())
                .map_err(|e| HandlerError::InvalidParams(e.to_string()))?;
            let result = func(params).await.map_err(Into::into)?;
            to_value(result)
        }
    })
}

/// Decode the argument at `index` (positional) or `name` (named)
///
/// A missing argument decodes from `null`, so `Option<T>` parameters are
/// optional.
pub fn decode_arg<T: DeserializeOwned>(
    params: &Params,
    index: usize,
    name: &str,
) -> std::result::Result<T, HandlerError> {
    let value = params.arg(index, name).cloned().unwrap_or(Value::Null);
    serde_json::from_value(value)
        .map_err(|e| HandlerError::InvalidParams(format!("{}: {}", name, e)))
}

/// Decode the rest arguments, from position `from` or member `name`
pub fn decode_rest<T: DeserializeOwned>(
    params: &Params,
    from: usize,
    name: &str,
) -> std::result::Result<Vec<T>, HandlerError> {
    params
        .rest(from, name)
        .into_iter()
        .map(|value| {
            serde_json::from_value(value)
                .map_err(|e| HandlerError::InvalidParams(format!("{}: {}", name, e)))
        })
        .collect()
}

/// Serialize a handler return value
pub fn to_value<R: Serialize>(result: R) -> HandlerResult {
    serde_json::to_value(result).map_err(HandlerError::from)
}

/// Serialize a fallible handler return value
pub fn result_to_value<R, E>(result: std::result::Result<R, E>) -> HandlerResult
where
    R: Serialize,
    E: Into<HandlerError>,
{
    result.map_err(Into::into).and_then(to_value)
}
