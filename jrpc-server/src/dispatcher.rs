//! Request dispatcher
//!
//! The dispatcher is the protocol engine of the server. It takes a raw
//! payload, independent of any transport, and produces the response payload:
//!
//! 1. Parse. Invalid JSON, an empty body or `null` give a single "Parse
//!    error" with a `null` id.
//! 2. An array is a batch. Anything else is handled as a batch of one.
//!    An empty array gives a single "Invalid Request".
//! 3. Each item is validated (`jsonrpc` is `"2.0"`, `method` is a string,
//!    `params` is absent, an array or an object, `id` is absent, a string, an
//!    integer or `null`). A malformed item gives "Invalid Request" with a
//!    `null` id at its position, even when it has no `id`.
//! 4. The method is resolved and its handler awaited. Each handler runs on
//!    its own task: a panicking handler yields "Internal error" for its item
//!    and leaves its siblings untouched.
//! 5. Notification slots are dropped, successful or not. If nothing is
//!    left there is no response body at all.
//!
//! Batch responses are emitted in submission order. In
//! [`BatchMode::Parallel`] every item starts before any is awaited; in
//! [`BatchMode::Sequential`] each item completes before the next one starts.
//!
//! # Examples
//!
//! ```rust
//! use jrpc_server::{from_fn, DispatchResponse, Dispatcher, MethodRegistry};
//!
//! # async fn example() {
//! let mut registry = MethodRegistry::new();
//! registry
//!     .add_named("ping", from_fn(|_| async { Ok(serde_json::json!("pong")) }))
//!     .unwrap();
//!
//! let dispatcher = Dispatcher::new(registry);
//! let response = dispatcher
//!     .dispatch(br#"{"jsonrpc":"2.0","method":"ping","id":1}"#)
//!     .await;
//! assert!(matches!(response, Some(DispatchResponse::Single(_))));
//!
//! // Notifications produce no body
//! let none = dispatcher
//!     .dispatch(br#"{"jsonrpc":"2.0","method":"ping"}"#)
//!     .await;
//! assert!(none.is_none());
//! # }
//! ```

use crate::handler::HandlerError;
use crate::metrics::ServerMetrics;
use crate::registry::{MethodRegistry, DISCOVERY_METHOD};
use jrpc_core::codec::{self, Payload};
use jrpc_core::{
    ErrorKind, Id, JsonRpcResponse, MethodDescriptor, Params, ServerError, JSONRPC_VERSION,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

/// How the items of one batch are executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchMode {
    /// All items run concurrently
    #[default]
    Parallel,
    /// Items run one after the other, in submission order
    Sequential,
}

impl BatchMode {
    fn as_str(self) -> &'static str {
        match self {
            BatchMode::Parallel => "parallel",
            BatchMode::Sequential => "sequential",
        }
    }
}

/// Response payload produced for one inbound payload
///
/// Serializes as the bare response object or the bare array.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DispatchResponse {
    /// Answer to a non-array payload, or a payload-level failure
    Single(JsonRpcResponse),
    /// Answers to a batch, in submission order
    Batch(Vec<JsonRpcResponse>),
}

impl DispatchResponse {
    /// Responses contained in this payload
    pub fn responses(&self) -> &[JsonRpcResponse] {
        match self {
            DispatchResponse::Single(response) => std::slice::from_ref(response),
            DispatchResponse::Batch(responses) => responses,
        }
    }
}

/// A validated item
struct Call {
    method: String,
    params: Params,
    /// `None` for notifications
    id: Option<Id>,
}

/// Transport-independent JSON-RPC dispatcher
///
/// Cheap to clone: the registry is shared.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<MethodRegistry>,
    mode: BatchMode,
    max_batch_size: Option<usize>,
    metrics: Option<Arc<ServerMetrics>>,
}

impl Dispatcher {
    /// Dispatcher over a registry, parallel batches, no batch size limit
    pub fn new(registry: MethodRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            mode: BatchMode::default(),
            max_batch_size: None,
            metrics: None,
        }
    }

    /// Set the batch execution mode
    pub fn with_batch_mode(mut self, mode: BatchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Reject batches larger than `max` with a single "Invalid Request"
    pub fn with_max_batch_size(mut self, max: Option<usize>) -> Self {
        self.max_batch_size = max;
        self
    }

    /// Record metrics for every dispatched item
    pub fn with_metrics(mut self, metrics: Option<Arc<ServerMetrics>>) -> Self {
        self.metrics = metrics;
        self
    }

    /// The registry served by this dispatcher
    pub fn registry(&self) -> &MethodRegistry {
        &self.registry
    }

    pub(crate) fn metrics(&self) -> Option<&ServerMetrics> {
        self.metrics.as_deref()
    }

    /// Method descriptors of the registry
    pub fn describe(&self) -> &[MethodDescriptor] {
        self.registry.describe()
    }

    /// Dispatch a raw payload
    ///
    /// Returns `None` when no response body must be sent.
    #[tracing::instrument(skip(self, body), fields(bytes = body.len()))]
    pub async fn dispatch(&self, body: &[u8]) -> Option<DispatchResponse> {
        match codec::decode(body) {
            Ok(payload) => self.dispatch_payload(payload).await,
            Err(error) => Some(self.payload_error(error)),
        }
    }

    /// Dispatch an already parsed payload
    ///
    /// Follows the same rules as [`Dispatcher::dispatch`]: `null` is a parse
    /// error and an empty array an invalid request.
    pub async fn dispatch_value(&self, value: Value) -> Option<DispatchResponse> {
        let payload = match value {
            Value::Null => return Some(self.payload_error(ServerError::parse_error())),
            Value::Array(items) if items.is_empty() => {
                return Some(self.payload_error(ServerError::invalid_request()))
            }
            Value::Array(items) => Payload::Batch(items),
            other => Payload::Single(other),
        };
        self.dispatch_payload(payload).await
    }

    async fn dispatch_payload(&self, payload: Payload) -> Option<DispatchResponse> {
        let is_batch = payload.is_batch();
        let items = payload.into_items();

        if is_batch {
            if let Some(metrics) = &self.metrics {
                metrics.record_batch(items.len() as u64, self.mode.as_str());
            }
            if let Some(max) = self.max_batch_size {
                if items.len() > max {
                    tracing::warn!(batch_size = items.len(), max_size = max, "Batch size exceeded");
                    let error = ServerError::with_message(
                        jrpc_core::ServerErrorKind::InvalidRequest,
                        Some(format!("batch of {} items exceeds the limit of {}", items.len(), max)),
                    );
                    return Some(self.payload_error(error));
                }
            }
        }

        let slots: Vec<Option<JsonRpcResponse>> = match self.mode {
            BatchMode::Parallel => {
                futures::future::join_all(items.into_iter().map(|item| self.run_item(item))).await
            }
            BatchMode::Sequential => {
                let mut slots = Vec::with_capacity(items.len());
                for item in items {
                    slots.push(self.run_item(item).await);
                }
                slots
            }
        };

        let mut responses: Vec<JsonRpcResponse> = slots.into_iter().flatten().collect();
        tracing::debug!(responses = responses.len(), batch = is_batch, "Payload dispatched");

        if responses.is_empty() {
            None
        } else if is_batch {
            Some(DispatchResponse::Batch(responses))
        } else {
            responses.pop().map(DispatchResponse::Single)
        }
    }

    fn payload_error(&self, error: ServerError) -> DispatchResponse {
        self.record_error(&error);
        DispatchResponse::Single(error.into_response())
    }

    async fn run_item(&self, item: Value) -> Option<JsonRpcResponse> {
        let call = match frame(item) {
            Ok(call) => call,
            Err(error) => {
                tracing::debug!("Invalid request item");
                self.record_error(&error);
                return Some(error.into_response());
            }
        };

        let Call { method, params, id } = call;
        let started = Instant::now();
        let registry = Arc::clone(&self.registry);
        let task_method = method.clone();

        let outcome = match tokio::spawn(invoke(registry, task_method, params)).await {
            Ok(outcome) => outcome,
            Err(join_error) => {
                tracing::error!(method = %method, error = %join_error, "Handler task failed");
                let reason = if join_error.is_panic() {
                    "handler panicked"
                } else {
                    "handler task cancelled"
                };
                Err(ServerError::internal_error(reason))
            }
        };

        if let Some(metrics) = &self.metrics {
            let status = if outcome.is_ok() { "success" } else { "error" };
            metrics.record_request(&method, status, started.elapsed().as_secs_f64());
        }

        match (id, outcome) {
            (None, Ok(_)) => None,
            (None, Err(error)) => {
                tracing::debug!(method = %method, error = %error, "Notification failed");
                None
            }
            (Some(id), Ok(result)) => Some(JsonRpcResponse::success(result, id)),
            (Some(id), Err(error)) => {
                tracing::debug!(method = %method, code = error.code(), "Call failed");
                self.record_error(&error);
                Some(error.with_id(id).into_response())
            }
        }
    }

    fn record_error(&self, error: &ServerError) {
        if let Some(metrics) = &self.metrics {
            metrics.record_error(error.kind().symbol());
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("mode", &self.mode)
            .field("max_batch_size", &self.max_batch_size)
            .finish()
    }
}

/// Validate one item of a payload
fn frame(item: Value) -> Result<Call, ServerError> {
    let Value::Object(mut object) = item else {
        return Err(ServerError::invalid_request());
    };

    if object.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        return Err(ServerError::invalid_request());
    }

    let method = match object.remove("method") {
        Some(Value::String(method)) => method,
        _ => return Err(ServerError::invalid_request()),
    };

    let params = match object.remove("params") {
        None => Params::none(),
        Some(Value::Array(values)) => Params::Positional(values),
        Some(Value::Object(map)) => Params::Named(map),
        Some(_) => return Err(ServerError::invalid_request()),
    };

    let id = match object.get("id") {
        None => None,
        Some(value) => Some(Id::from_value(value).ok_or_else(ServerError::invalid_request)?),
    };

    Ok(Call { method, params, id })
}

/// Resolve and run one method
async fn invoke(
    registry: Arc<MethodRegistry>,
    method: String,
    params: Params,
) -> Result<Value, ServerError> {
    if let Some(definition) = registry.get(&method) {
        return definition
            .handler()
            .handle(params)
            .await
            .map_err(|e: HandlerError| e.into_server_error(Id::Null));
    }

    if method == DISCOVERY_METHOD {
        return serde_json::to_value(registry.describe())
            .map_err(|e| ServerError::internal_error(e.to_string()));
    }

    Err(ServerError::method_not_found(&method))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{from_fn, from_sync_fn};
    use crate::registry::MethodDefinition;
    use jrpc_core::{ClientErrorKind, ServerErrorKind};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn registry() -> MethodRegistry {
        let mut registry = MethodRegistry::new();
        registry
            .add(
                MethodDefinition::new(
                    "sum",
                    from_sync_fn(|params| {
                        let total: i64 = params.rest(0, "values").iter().filter_map(Value::as_i64).sum();
                        Ok(json!(total))
                    }),
                )
                .rest("values"),
            )
            .unwrap()
            .add(("mirror", from_fn(|params| async move { Ok(params.into_value()) })))
            .unwrap()
            .add((
                "fail",
                from_sync_fn(|_| Err(HandlerError::new("throw Error"))),
            ))
            .unwrap()
            .add((
                "slow",
                from_fn(|params| async move {
                    let ms = params.arg(0, "ms").and_then(Value::as_u64).unwrap_or(0);
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                    Ok(json!(ms))
                }),
            ))
            .unwrap()
            .add((
                "panic",
                from_sync_fn(|_| -> crate::handler::HandlerResult { panic!("boom") }),
            ))
            .unwrap();
        registry
    }

    async fn dispatch(dispatcher: &Dispatcher, body: Value) -> Option<Value> {
        let bytes = serde_json::to_vec(&body).unwrap();
        dispatcher
            .dispatch(&bytes)
            .await
            .map(|r| serde_json::to_value(r).unwrap())
    }

    #[tokio::test]
    async fn test_single_call() {
        let dispatcher = Dispatcher::new(registry());
        let response = dispatch(
            &dispatcher,
            json!({"jsonrpc": "2.0", "method": "sum", "params": [1, 2, 3], "id": "a-1"}),
        )
        .await
        .unwrap();

        assert_eq!(response, json!({"jsonrpc": "2.0", "result": 6, "id": "a-1"}));
    }

    #[tokio::test]
    async fn test_mirror_named_params() {
        let dispatcher = Dispatcher::new(registry());
        let response = dispatch(
            &dispatcher,
            json!({"jsonrpc": "2.0", "method": "mirror", "params": {"x": [1, {"y": null}]}, "id": 4}),
        )
        .await
        .unwrap();

        assert_eq!(response["result"], json!({"x": [1, {"y": null}]}));
        assert_eq!(response["id"], json!(4));
    }

    #[tokio::test]
    async fn test_absent_params_are_empty() {
        let dispatcher = Dispatcher::new(registry());
        let response = dispatch(&dispatcher, json!({"jsonrpc": "2.0", "method": "mirror", "id": 1}))
            .await
            .unwrap();
        assert_eq!(response["result"], json!([]));
    }

    #[tokio::test]
    async fn test_parse_errors() {
        let dispatcher = Dispatcher::new(registry());
        for body in [&b"{bad"[..], b"", b"null"] {
            let response = dispatcher.dispatch(body).await.unwrap();
            let value = serde_json::to_value(response).unwrap();
            assert_eq!(
                value,
                json!({"jsonrpc": "2.0", "error": {"code": -32700, "message": "Parse error"}, "id": null})
            );
        }
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let dispatcher = Dispatcher::new(registry());
        let response = dispatch(&dispatcher, json!([])).await.unwrap();
        assert_eq!(response["error"]["code"], json!(-32600));
        assert_eq!(response["id"], Value::Null);
        assert!(response.is_object());
    }

    #[tokio::test]
    async fn test_invalid_items() {
        let dispatcher = Dispatcher::new(registry());
        let response = dispatch(
            &dispatcher,
            json!([
                1,
                {"jsonrpc": "1.0", "method": "sum", "id": 1},
                {"jsonrpc": "2.0", "method": 5, "id": 2},
                {"jsonrpc": "2.0", "method": "sum", "params": "x", "id": 3},
                {"jsonrpc": "2.0", "method": "sum", "id": [4]},
                {"jsonrpc": "2.0", "method": 7}
            ]),
        )
        .await
        .unwrap();

        let items = response.as_array().unwrap();
        assert_eq!(items.len(), 6);
        for item in items {
            assert_eq!(item["error"]["code"], json!(-32600));
            assert_eq!(item["id"], Value::Null);
        }
    }

    #[tokio::test]
    async fn test_method_not_found() {
        let dispatcher = Dispatcher::new(registry());
        let response = dispatch(
            &dispatcher,
            json!({"jsonrpc": "2.0", "method": "nope", "id": "x"}),
        )
        .await
        .unwrap();

        assert_eq!(response["error"]["code"], json!(-32601));
        assert_eq!(response["error"]["message"], json!("Method not found: nope"));
        assert_eq!(response["id"], json!("x"));
    }

    #[tokio::test]
    async fn test_handler_failure_is_application_error() {
        let dispatcher = Dispatcher::new(registry());
        let response = dispatch(&dispatcher, json!({"jsonrpc": "2.0", "method": "fail", "id": 9}))
            .await
            .unwrap();

        assert_eq!(
            response["error"],
            json!({
                "code": -32099,
                "message": "Application error",
                "data": {"name": "Error", "message": "throw Error"}
            })
        );
        assert_eq!(response["id"], json!(9));
    }

    #[tokio::test]
    async fn test_panic_is_isolated() {
        let dispatcher = Dispatcher::new(registry());
        let response = dispatch(
            &dispatcher,
            json!([
                {"jsonrpc": "2.0", "method": "panic", "id": 1},
                {"jsonrpc": "2.0", "method": "sum", "params": [1, 1], "id": 2}
            ]),
        )
        .await
        .unwrap();

        assert_eq!(response[0]["error"]["code"], json!(-32603));
        assert_eq!(response[0]["id"], json!(1));
        assert_eq!(response[1]["result"], json!(2));
    }

    #[tokio::test]
    async fn test_mixed_batch_drops_notifications() {
        let dispatcher = Dispatcher::new(registry());
        let response = dispatch(
            &dispatcher,
            json!([
                {"jsonrpc": "2.0", "method": "sum", "params": [1, 2], "id": "1"},
                {"jsonrpc": "2.0", "method": "fail"},
                {"jsonrpc": "2.0", "method": "nope"},
                {"jsonrpc": "2.0", "method": "mirror", "params": ["m"], "id": "2"}
            ]),
        )
        .await
        .unwrap();

        let items = response.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["id"], json!("1"));
        assert_eq!(items[1]["id"], json!("2"));
    }

    #[tokio::test]
    async fn test_all_notifications_no_body() {
        let dispatcher = Dispatcher::new(registry());
        let response = dispatch(
            &dispatcher,
            json!([
                {"jsonrpc": "2.0", "method": "sum", "params": [1]},
                {"jsonrpc": "2.0", "method": "fail"}
            ]),
        )
        .await;
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_parallel_batch_in_submission_order() {
        let dispatcher = Dispatcher::new(registry());
        let started = Instant::now();
        let response = dispatch(
            &dispatcher,
            json!([
                {"jsonrpc": "2.0", "method": "slow", "params": [150], "id": 1},
                {"jsonrpc": "2.0", "method": "slow", "params": [10], "id": 2},
                {"jsonrpc": "2.0", "method": "slow", "params": [150], "id": 3}
            ]),
        )
        .await
        .unwrap();

        let ids: Vec<_> = response.as_array().unwrap().iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!(1), json!(2), json!(3)]);
        // Items ran concurrently
        assert!(started.elapsed() < Duration::from_millis(290));
    }

    #[tokio::test]
    async fn test_sequential_mode_runs_in_order() {
        let counter = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&counter);

        let mut registry = MethodRegistry::new();
        registry
            .add_named(
                "next",
                from_fn(move |params| {
                    let seen = Arc::clone(&seen);
                    async move {
                        let ms = params.arg(0, "ms").and_then(Value::as_u64).unwrap_or(0);
                        tokio::time::sleep(Duration::from_millis(ms)).await;
                        Ok(json!(seen.fetch_add(1, Ordering::SeqCst)))
                    }
                }),
            )
            .unwrap();

        let dispatcher = Dispatcher::new(registry).with_batch_mode(BatchMode::Sequential);
        let response = dispatch(
            &dispatcher,
            json!([
                {"jsonrpc": "2.0", "method": "next", "params": [50], "id": 1},
                {"jsonrpc": "2.0", "method": "next", "params": [0], "id": 2}
            ]),
        )
        .await
        .unwrap();

        assert_eq!(response[0]["result"], json!(0));
        assert_eq!(response[1]["result"], json!(1));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_max_batch_size() {
        let dispatcher = Dispatcher::new(registry()).with_max_batch_size(Some(1));
        let response = dispatch(
            &dispatcher,
            json!([
                {"jsonrpc": "2.0", "method": "sum", "id": 1},
                {"jsonrpc": "2.0", "method": "sum", "id": 2}
            ]),
        )
        .await
        .unwrap();

        assert_eq!(response["error"]["code"], json!(-32600));
        assert_eq!(
            response["error"]["message"],
            json!("Invalid Request: batch of 2 items exceeds the limit of 1")
        );
    }

    #[tokio::test]
    async fn test_discovery_method() {
        let dispatcher = Dispatcher::new(registry());
        let response = dispatch(
            &dispatcher,
            json!({"jsonrpc": "2.0", "method": DISCOVERY_METHOD, "id": 1}),
        )
        .await
        .unwrap();

        let descriptors = response["result"].as_array().unwrap();
        assert_eq!(descriptors.len(), 5);
        assert_eq!(descriptors[0], json!({"name": "sum", "params": ["...values"]}));
        assert!(descriptors.iter().all(|d| d["name"] != json!(DISCOVERY_METHOD)));
    }

    #[tokio::test]
    async fn test_user_method_shadows_discovery() {
        let mut registry = registry();
        registry
            .add_named(DISCOVERY_METHOD, from_fn(|_| async { Ok(json!("mine")) }))
            .unwrap();

        let dispatcher = Dispatcher::new(registry);
        let response = dispatch(
            &dispatcher,
            json!({"jsonrpc": "2.0", "method": DISCOVERY_METHOD, "id": 1}),
        )
        .await
        .unwrap();
        assert_eq!(response["result"], json!("mine"));
    }

    #[tokio::test]
    async fn test_dispatch_value() {
        let dispatcher = Dispatcher::new(registry());

        let null = dispatcher.dispatch_value(Value::Null).await.unwrap();
        assert_eq!(null.responses()[0].error.as_ref().unwrap().code, -32700);

        let empty = dispatcher.dispatch_value(json!([])).await.unwrap();
        assert_eq!(empty.responses()[0].error.as_ref().unwrap().code, -32600);

        let ok = dispatcher
            .dispatch_value(json!({"jsonrpc": "2.0", "method": "sum", "params": [2], "id": 1}))
            .await
            .unwrap();
        assert_eq!(ok.responses()[0].result, Some(json!(2)));
    }

    #[test]
    fn test_error_kinds_are_server_family() {
        // Client-side codes never come out of the dispatcher
        assert!(ServerErrorKind::from_code(ClientErrorKind::InvalidResponse.code()).is_none());
    }
}
